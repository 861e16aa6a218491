use crate::shared::constants::PLANAR_BIT_DEPTH;

/// Plane index within a 4:2:2 planar frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Plane {
    Luma,
    Cb,
    Cr,
}

impl Plane {
    pub const ALL: [Plane; 3] = [Plane::Luma, Plane::Cb, Plane::Cr];

    pub fn index(self) -> usize {
        match self {
            Plane::Luma => 0,
            Plane::Cb => 1,
            Plane::Cr => 2,
        }
    }
}

/// Encoder-ready picture: 10-bit samples, 4:2:2 chroma, one `u16` per
/// sample, three separate planes.
///
/// Chroma planes are half width (rounded up) and full height. Strides are
/// in samples and may exceed the plane width.
#[derive(Clone, Debug, PartialEq)]
pub struct PackagedFrame {
    width: u32,
    height: u32,
    planes: [Vec<u16>; 3],
    strides: [usize; 3],
}

impl PackagedFrame {
    pub const MAX_SAMPLE: u16 = (1 << PLANAR_BIT_DEPTH) - 1;

    pub fn new(width: u32, height: u32) -> Self {
        let strides = [
            width as usize,
            chroma_width(width) as usize,
            chroma_width(width) as usize,
        ];
        let planes = strides.map(|stride| vec![0u16; stride * height as usize]);
        Self {
            width,
            height,
            planes,
            strides,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn plane_width(&self, plane: Plane) -> u32 {
        match plane {
            Plane::Luma => self.width,
            Plane::Cb | Plane::Cr => chroma_width(self.width),
        }
    }

    pub fn stride(&self, plane: Plane) -> usize {
        self.strides[plane.index()]
    }

    pub fn plane(&self, plane: Plane) -> &[u16] {
        &self.planes[plane.index()]
    }

    pub fn plane_mut(&mut self, plane: Plane) -> &mut [u16] {
        &mut self.planes[plane.index()]
    }

    pub fn row(&self, plane: Plane, y: u32) -> &[u16] {
        let stride = self.stride(plane);
        let start = y as usize * stride;
        &self.planes[plane.index()][start..start + self.plane_width(plane) as usize]
    }

    pub fn row_mut(&mut self, plane: Plane, y: u32) -> &mut [u16] {
        let stride = self.stride(plane);
        let width = self.plane_width(plane) as usize;
        let start = y as usize * stride;
        &mut self.planes[plane.index()][start..start + width]
    }

    pub fn sample(&self, plane: Plane, x: u32, y: u32) -> u16 {
        self.row(plane, y)[x as usize]
    }
}

pub fn chroma_width(width: u32) -> u32 {
    width.div_ceil(2)
}
