// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

//! Memory backend capability
//!
//! The engine never touches device memory directly. Cell and row arrays are
//! staged through a [`MemoryBackend`] selected by configuration, exposing only
//! `allocate`, `copy` and `free`. Failures surface as
//! [`LegalizeError::BackendAllocation`] instead of aborting the process, so a
//! caller keeps whatever progress it already has.
//!
//! [`HostBackend`] keeps buffers in ordinary heap memory. [`DevicePool`]
//! emulates a device heap of fixed capacity; an application with real CUDA or
//! HIP bindings plugs them in by implementing the trait.

use std::collections::HashMap;
use std::fmt;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::config::BackendConfig;
use crate::error::{LegalizeError, Result};
use crate::geometry::Coord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementType {
    I32,
    I64,
    F32,
    F64,
}

impl ElementType {
    pub fn size_bytes(self) -> usize {
        match self {
            ElementType::I32 | ElementType::F32 => 4,
            ElementType::I64 | ElementType::F64 => 8,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    #[default]
    Host,
    Cuda,
    Hip,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Host => write!(f, "host"),
            BackendKind::Cuda => write!(f, "cuda"),
            BackendKind::Hip => write!(f, "hip"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyDirection {
    HostToDevice,
    DeviceToHost,
    DeviceToDevice,
}

/// A copy request. The variant fixes the direction.
pub enum Transfer<'a> {
    HostToDevice { src: &'a [u8], dst: BufferId },
    DeviceToHost { src: BufferId, dst: &'a mut [u8] },
    DeviceToDevice { src: BufferId, dst: BufferId },
}

impl Transfer<'_> {
    pub fn direction(&self) -> CopyDirection {
        match self {
            Transfer::HostToDevice { .. } => CopyDirection::HostToDevice,
            Transfer::DeviceToHost { .. } => CopyDirection::DeviceToHost,
            Transfer::DeviceToDevice { .. } => CopyDirection::DeviceToDevice,
        }
    }
}

pub trait MemoryBackend: Send {
    fn kind(&self) -> BackendKind;

    /// Reserve room for `count` elements of `element`.
    fn allocate(&mut self, count: usize, element: ElementType) -> Result<BufferId>;

    /// Move `count` elements as described by `transfer`.
    fn copy(&mut self, transfer: Transfer<'_>, count: usize) -> Result<()>;

    fn free(&mut self, buffer: BufferId) -> Result<()>;

    /// Number of buffers allocated and not yet freed.
    fn live_buffers(&self) -> usize;
}

#[derive(Debug)]
struct Allocation {
    element: ElementType,
    bytes: Vec<u8>,
}

/// Buffer bookkeeping shared by the backends.
#[derive(Debug, Default)]
struct BufferArena {
    next_id: u64,
    buffers: HashMap<BufferId, Allocation>,
}

impl BufferArena {
    fn insert(&mut self, count: usize, element: ElementType) -> BufferId {
        let id = BufferId(self.next_id);
        self.next_id += 1;
        self.buffers.insert(
            id,
            Allocation {
                element,
                bytes: vec![0; count * element.size_bytes()],
            },
        );
        id
    }

    fn remove(&mut self, kind: BackendKind, buffer: BufferId) -> Result<usize> {
        self.buffers
            .remove(&buffer)
            .map(|allocation| allocation.bytes.len())
            .ok_or_else(|| {
                LegalizeError::backend(kind.to_string(), format!("free of unknown buffer {buffer:?}"))
            })
    }

    fn byte_span(&self, kind: BackendKind, buffer: BufferId, count: usize) -> Result<usize> {
        let allocation = self.buffers.get(&buffer).ok_or_else(|| {
            LegalizeError::backend(kind.to_string(), format!("unknown buffer {buffer:?}"))
        })?;
        let bytes = count * allocation.element.size_bytes();
        if bytes > allocation.bytes.len() {
            return Err(LegalizeError::backend(
                kind.to_string(),
                format!(
                    "copy of {count} elements overruns buffer {buffer:?} of {} bytes",
                    allocation.bytes.len()
                ),
            ));
        }
        Ok(bytes)
    }

    fn copy(&mut self, kind: BackendKind, transfer: Transfer<'_>, count: usize) -> Result<()> {
        let direction = transfer.direction();
        match transfer {
            Transfer::HostToDevice { src, dst } => {
                let bytes = self.byte_span(kind, dst, count)?;
                if src.len() < bytes {
                    return Err(LegalizeError::backend(
                        kind.to_string(),
                        format!("host source holds {} bytes, {bytes} requested", src.len()),
                    ));
                }
                if let Some(allocation) = self.buffers.get_mut(&dst) {
                    allocation.bytes[..bytes].copy_from_slice(&src[..bytes]);
                }
            }
            Transfer::DeviceToHost { src, dst } => {
                let bytes = self.byte_span(kind, src, count)?;
                if dst.len() < bytes {
                    return Err(LegalizeError::backend(
                        kind.to_string(),
                        format!("host destination holds {} bytes, {bytes} requested", dst.len()),
                    ));
                }
                if let Some(allocation) = self.buffers.get(&src) {
                    dst[..bytes].copy_from_slice(&allocation.bytes[..bytes]);
                }
            }
            Transfer::DeviceToDevice { src, dst } => {
                let bytes = self.byte_span(kind, src, count)?;
                let dst_bytes = self.byte_span(kind, dst, count)?;
                if bytes != dst_bytes {
                    return Err(LegalizeError::backend(
                        kind.to_string(),
                        "device copy between buffers of different element types",
                    ));
                }
                let staged = self
                    .buffers
                    .get(&src)
                    .map(|allocation| allocation.bytes[..bytes].to_vec())
                    .unwrap_or_default();
                if let Some(allocation) = self.buffers.get_mut(&dst) {
                    allocation.bytes[..bytes].copy_from_slice(&staged);
                }
            }
        }
        debug!("[{kind}] {direction:?} copy of {count} elements");
        Ok(())
    }
}

/// Buffers in ordinary host memory; allocation never runs out.
#[derive(Debug, Default)]
pub struct HostBackend {
    arena: BufferArena,
}

impl HostBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MemoryBackend for HostBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Host
    }

    fn allocate(&mut self, count: usize, element: ElementType) -> Result<BufferId> {
        Ok(self.arena.insert(count, element))
    }

    fn copy(&mut self, transfer: Transfer<'_>, count: usize) -> Result<()> {
        self.arena.copy(BackendKind::Host, transfer, count)
    }

    fn free(&mut self, buffer: BufferId) -> Result<()> {
        self.arena.remove(BackendKind::Host, buffer).map(|_| ())
    }

    fn live_buffers(&self) -> usize {
        self.arena.buffers.len()
    }
}

/// Emulated device heap with a fixed byte capacity.
#[derive(Debug)]
pub struct DevicePool {
    kind: BackendKind,
    capacity_bytes: usize,
    used_bytes: usize,
    arena: BufferArena,
}

impl DevicePool {
    pub fn new(kind: BackendKind, capacity_bytes: usize) -> Self {
        Self {
            kind,
            capacity_bytes,
            used_bytes: 0,
            arena: BufferArena::default(),
        }
    }

    pub fn used_bytes(&self) -> usize {
        self.used_bytes
    }

    pub fn capacity_bytes(&self) -> usize {
        self.capacity_bytes
    }
}

impl MemoryBackend for DevicePool {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn allocate(&mut self, count: usize, element: ElementType) -> Result<BufferId> {
        let bytes = count
            .checked_mul(element.size_bytes())
            .ok_or_else(|| LegalizeError::backend(self.kind.to_string(), "allocation size overflow"))?;
        if self.used_bytes + bytes > self.capacity_bytes {
            return Err(LegalizeError::backend(
                self.kind.to_string(),
                format!(
                    "out of device memory: {bytes} bytes requested, {} of {} in use",
                    self.used_bytes, self.capacity_bytes
                ),
            ));
        }
        self.used_bytes += bytes;
        Ok(self.arena.insert(count, element))
    }

    fn copy(&mut self, transfer: Transfer<'_>, count: usize) -> Result<()> {
        self.arena.copy(self.kind, transfer, count)
    }

    fn free(&mut self, buffer: BufferId) -> Result<()> {
        let bytes = self.arena.remove(self.kind, buffer)?;
        self.used_bytes -= bytes;
        Ok(())
    }

    fn live_buffers(&self) -> usize {
        self.arena.buffers.len()
    }
}

pub fn backend_from_config(config: &BackendConfig) -> Box<dyn MemoryBackend> {
    match config.kind {
        BackendKind::Host => Box::new(HostBackend::new()),
        kind => Box::new(DevicePool::new(kind, config.device_capacity_bytes)),
    }
}

/// Upload `values` into a freshly allocated buffer.
pub fn stage<T: Coord>(backend: &mut dyn MemoryBackend, values: &[T]) -> Result<BufferId> {
    let buffer = backend.allocate(values.len(), T::ELEMENT)?;
    let mut bytes = Vec::with_capacity(values.len() * T::ELEMENT.size_bytes());
    for value in values {
        value.write_le(&mut bytes);
    }
    if let Err(err) = backend.copy(Transfer::HostToDevice { src: &bytes, dst: buffer }, values.len()) {
        if let Err(free_err) = backend.free(buffer) {
            warn!("[WARN] {} buffer {buffer:?} leaked after failed upload: {free_err}", backend.kind());
        }
        return Err(err);
    }
    Ok(buffer)
}

/// Download `len` elements from `buffer`.
pub fn fetch<T: Coord>(backend: &mut dyn MemoryBackend, buffer: BufferId, len: usize) -> Result<Vec<T>> {
    let size = T::ELEMENT.size_bytes();
    let mut bytes = vec![0u8; len * size];
    backend.copy(Transfer::DeviceToHost { src: buffer, dst: &mut bytes }, len)?;
    bytes
        .chunks_exact(size)
        .map(|chunk| {
            T::read_le(chunk).ok_or_else(|| {
                LegalizeError::backend(backend.kind().to_string(), "malformed element in download")
            })
        })
        .collect()
}

/// Stage `values` through the backend and read them back, releasing the buffer.
pub fn round_trip<T: Coord>(backend: &mut dyn MemoryBackend, values: &[T]) -> Result<Vec<T>> {
    let buffer = stage(backend, values)?;
    let fetched = fetch(backend, buffer, values.len());
    let freed = backend.free(buffer);
    let values = fetched?;
    freed?;
    Ok(values)
}
