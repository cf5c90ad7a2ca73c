use super::gpu::{AttrPlacement, BufferId, BufferKind, BufferUsage, GpuBackend, VertexAttr, VertexLayout};
use crate::error::GpuError;

/// CPU copy of a vertex buffer. Interleaved attributes share one block at the
/// front; the others follow it, one contiguous block each.
#[derive(Debug, Clone)]
pub struct VectorsBuffer {
    id: BufferId,
    usage: BufferUsage,
    vectors: Vec<(VertexAttr, bool)>,
    len: usize,
    data: Vec<f32>,
}

impl VectorsBuffer {
    fn new(id: BufferId, usage: BufferUsage) -> Self {
        Self {
            id,
            usage,
            vectors: Vec::new(),
            len: 0,
            data: Vec::new(),
        }
    }

    pub fn id(&self) -> BufferId {
        self.id
    }

    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    pub fn num_vectors(&self) -> usize {
        self.vectors.len()
    }

    pub fn add_vectors(&mut self, attr: VertexAttr, interleave: bool) {
        self.vectors.push((attr, interleave));
        self.resize();
    }

    pub fn delete_all_vectors(&mut self) {
        self.vectors.clear();
        self.data.clear();
    }

    /// Number of elements per attribute.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn set_len(&mut self, len: usize) {
        self.len = len;
        self.resize();
    }

    fn interleaved_stride(&self) -> usize {
        self.vectors
            .iter()
            .filter(|(_, inter)| *inter)
            .map(|(a, _)| a.components())
            .sum()
    }

    fn resize(&mut self) {
        let per_elem: usize = self.vectors.iter().map(|(a, _)| a.components()).sum();
        self.data.resize(per_elem * self.len, 0.0);
    }

    pub fn layout(&self) -> VertexLayout {
        let stride = self.interleaved_stride();
        let mut inter_off = 0;
        let mut block_off = stride * self.len;
        let attrs = self
            .vectors
            .iter()
            .map(|&(attr, interleave)| {
                let comps = attr.components();
                if interleave {
                    let p = AttrPlacement {
                        attr,
                        start: inter_off,
                        stride,
                    };
                    inter_off += comps;
                    p
                } else {
                    let p = AttrPlacement {
                        attr,
                        start: block_off,
                        stride: comps,
                    };
                    block_off += comps * self.len;
                    p
                }
            })
            .collect();
        VertexLayout { len: self.len, attrs }
    }

    /// Copies `src` into the attribute's slots. Writes stop at the current
    /// length; the element count never changes here.
    pub fn set_vec_data(&mut self, attr: VertexAttr, src: &[f32]) {
        let Some(p) = self.layout().placement(attr) else {
            return;
        };
        let comps = attr.components();
        for (i, elem) in src.chunks_exact(comps).take(self.len).enumerate() {
            let at = p.start + i * p.stride;
            self.data[at..at + comps].copy_from_slice(elem);
        }
    }

    /// Reads one attribute back out of the packed data.
    pub fn vec_data(&self, attr: VertexAttr) -> Vec<f32> {
        let Some(p) = self.layout().placement(attr) else {
            return Vec::new();
        };
        let comps = attr.components();
        (0..self.len)
            .flat_map(|i| {
                let at = p.start + i * p.stride;
                self.data[at..at + comps].iter().copied()
            })
            .collect()
    }

    pub fn all_data(&self) -> &[f32] {
        &self.data
    }
}

#[derive(Debug, Clone)]
pub struct IndexesBuffer {
    id: BufferId,
    data: Vec<u32>,
}

impl IndexesBuffer {
    pub fn id(&self) -> BufferId {
        self.id
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn set(&mut self, idx: &[u32]) {
        self.data.clear();
        self.data.extend_from_slice(idx);
    }

    pub fn data(&self) -> &[u32] {
        &self.data
    }
}

/// One mesh's vectors and indexes buffers, CPU side plus the GPU handles.
#[derive(Debug, Clone)]
pub struct BufferMgr {
    vectors: VectorsBuffer,
    indexes: IndexesBuffer,
}

impl BufferMgr {
    /// The vectors buffer takes `usage`; indexes are always static.
    pub fn new(gpu: &mut dyn GpuBackend, usage: BufferUsage) -> Self {
        let vid = gpu.create_buffer(BufferKind::Vectors, usage);
        let iid = gpu.create_buffer(BufferKind::Indexes, BufferUsage::Static);
        Self {
            vectors: VectorsBuffer::new(vid, usage),
            indexes: IndexesBuffer {
                id: iid,
                data: Vec::new(),
            },
        }
    }

    pub fn vectors(&self) -> &VectorsBuffer {
        &self.vectors
    }

    pub fn vectors_mut(&mut self) -> &mut VectorsBuffer {
        &mut self.vectors
    }

    pub fn indexes(&self) -> &IndexesBuffer {
        &self.indexes
    }

    pub fn indexes_mut(&mut self) -> &mut IndexesBuffer {
        &mut self.indexes
    }

    pub fn activate(&self, gpu: &mut dyn GpuBackend) -> Result<(), GpuError> {
        gpu.bind(self.vectors.id, self.indexes.id)
    }

    pub fn transfer_vectors(&self, gpu: &mut dyn GpuBackend) -> Result<(), GpuError> {
        gpu.upload_vectors(self.vectors.id, &self.vectors.layout(), &self.vectors.data)
    }

    pub fn transfer_indexes(&self, gpu: &mut dyn GpuBackend) -> Result<(), GpuError> {
        gpu.upload_indexes(self.indexes.id, &self.indexes.data)
    }

    pub fn transfer_all(&self, gpu: &mut dyn GpuBackend) -> Result<(), GpuError> {
        self.transfer_vectors(gpu)?;
        self.transfer_indexes(gpu)
    }

    pub fn delete(self, gpu: &mut dyn GpuBackend) {
        gpu.delete_buffer(self.vectors.id);
        gpu.delete_buffer(self.indexes.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::HeadlessGpu;

    fn mesh_layout(gpu: &mut HeadlessGpu, color: bool) -> BufferMgr {
        let mut mgr = BufferMgr::new(gpu, BufferUsage::Static);
        let vb = mgr.vectors_mut();
        vb.add_vectors(VertexAttr::Position, true);
        vb.add_vectors(VertexAttr::Normal, true);
        vb.add_vectors(VertexAttr::TexCoord, true);
        if color {
            vb.add_vectors(VertexAttr::Color, false);
        }
        mgr
    }

    #[test]
    fn interleaved_stride_is_eight_with_color_after() {
        let mut gpu = HeadlessGpu::new();
        let mut mgr = mesh_layout(&mut gpu, true);
        mgr.vectors_mut().set_len(2);
        let layout = mgr.vectors().layout();
        assert_eq!(layout.placement(VertexAttr::Normal).map(|p| (p.start, p.stride)), Some((3, 8)));
        assert_eq!(layout.placement(VertexAttr::TexCoord).map(|p| p.start), Some(6));
        assert_eq!(layout.placement(VertexAttr::Color).map(|p| (p.start, p.stride)), Some((16, 4)));
        assert_eq!(mgr.vectors().all_data().len(), 2 * 8 + 2 * 4);
    }

    #[test]
    fn set_vec_data_truncates_to_len() {
        let mut gpu = HeadlessGpu::new();
        let mut mgr = mesh_layout(&mut gpu, false);
        let vb = mgr.vectors_mut();
        vb.set_len(1);
        vb.set_vec_data(VertexAttr::Position, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(vb.len(), 1);
        assert_eq!(vb.vec_data(VertexAttr::Position), vec![1.0, 2.0, 3.0]);
        assert_eq!(vb.all_data()[3..8], [0.0; 5]);
    }
}
