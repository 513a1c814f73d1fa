use crate::integrals::OrbitalSpaces;
use hashbrown::HashMap;
use ndarray::prelude::*;

/// Orbital-rotation blocks of the response vector, in packing order.
/// The `ci` block of determinant coefficients follows them.
pub const ORB_BLOCKS: [&str; 4] = ["vc", "ca", "va", "aa"];

/// Flat packing of the coupled orbital/CI response vector.
///
/// The rectangular blocks `vc`, `ca` and `va` are stored row major. The
/// antisymmetric `aa` block keeps only the strict lower triangle with
/// index `offset + i(i-1)/2 + j` for `i > j`; the diagonal and upper
/// triangle are redundant. The layout is built once per solve.
pub struct ResponseLayout {
    offsets: HashMap<&'static str, usize>,
    shapes: HashMap<&'static str, (usize, usize)>,
    pub n_dets: usize,
    pub dim: usize,
}

impl ResponseLayout {
    pub fn new(spaces: &OrbitalSpaces, n_dets: usize) -> Self {
        let (nc, na, nv) = (spaces.n_core, spaces.n_actv, spaces.n_virt);
        let mut offsets: HashMap<&'static str, usize> = HashMap::new();
        let mut shapes: HashMap<&'static str, (usize, usize)> = HashMap::new();
        shapes.insert("vc", (nv, nc));
        shapes.insert("ca", (nc, na));
        shapes.insert("va", (nv, na));
        shapes.insert("aa", (na, na));
        let mut offset: usize = 0;
        for &block in ORB_BLOCKS.iter() {
            offsets.insert(block, offset);
            offset += Self::block_len(block, shapes[block]);
        }
        offsets.insert("ci", offset);
        offset += n_dets;
        ResponseLayout {
            offsets,
            shapes,
            n_dets,
            dim: offset,
        }
    }

    fn block_len(block: &str, (rows, cols): (usize, usize)) -> usize {
        if block == "aa" {
            rows.saturating_sub(1) * rows / 2
        } else {
            rows * cols
        }
    }

    pub fn offset(&self, block: &str) -> usize {
        *self
            .offsets
            .get(block)
            .unwrap_or_else(|| panic!("unknown response block: {}", block))
    }

    pub fn shape(&self, block: &str) -> (usize, usize) {
        *self
            .shapes
            .get(block)
            .unwrap_or_else(|| panic!("unknown response block: {}", block))
    }

    /// Scatter an orbital block into the flat vector.
    pub fn pack_orb(&self, block: &str, t: ArrayView2<f64>, out: &mut Array1<f64>) {
        assert_eq!(out.len(), self.dim, "flat vector has the wrong length");
        let (rows, cols) = self.shape(block);
        assert_eq!(t.dim(), (rows, cols), "block {} has the wrong shape", block);
        let offset: usize = self.offset(block);
        if block == "aa" {
            for i in 1..rows {
                for j in 0..i {
                    out[offset + i * (i - 1) / 2 + j] = t[[i, j]];
                }
            }
        } else {
            for i in 0..rows {
                for j in 0..cols {
                    out[offset + i * cols + j] = t[[i, j]];
                }
            }
        }
    }

    /// Gather an orbital block from the flat vector. The `aa` block is
    /// returned with only its strict lower triangle filled; use
    /// [`antisymmetrize`] to complete it.
    pub fn unpack_orb(&self, block: &str, x: ArrayView1<f64>) -> Array2<f64> {
        assert_eq!(x.len(), self.dim, "flat vector has the wrong length");
        let (rows, cols) = self.shape(block);
        let offset: usize = self.offset(block);
        let mut t: Array2<f64> = Array2::zeros((rows, cols));
        if block == "aa" {
            for i in 1..rows {
                for j in 0..i {
                    t[[i, j]] = x[offset + i * (i - 1) / 2 + j];
                }
            }
        } else {
            for i in 0..rows {
                for j in 0..cols {
                    t[[i, j]] = x[offset + i * cols + j];
                }
            }
        }
        t
    }

    pub fn pack_ci(&self, t: ArrayView1<f64>, out: &mut Array1<f64>) {
        assert_eq!(out.len(), self.dim, "flat vector has the wrong length");
        assert_eq!(t.len(), self.n_dets, "ci block has the wrong length");
        let offset: usize = self.offset("ci");
        out.slice_mut(s![offset..offset + self.n_dets]).assign(&t);
    }

    pub fn unpack_ci(&self, x: ArrayView1<f64>) -> Array1<f64> {
        assert_eq!(x.len(), self.dim, "flat vector has the wrong length");
        let offset: usize = self.offset("ci");
        x.slice(s![offset..offset + self.n_dets]).to_owned()
    }
}

/// Complete a lower-triangular square matrix antisymmetrically:
/// `m[j,i] = -m[i,j]` with a zero diagonal.
pub fn antisymmetrize(m: &mut Array2<f64>) {
    let n: usize = m.nrows();
    assert_eq!(n, m.ncols(), "antisymmetrize requires a square matrix");
    for i in 0..n {
        m[[i, i]] = 0.0;
        for j in 0..i {
            m[[j, i]] = -m[[i, j]];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> ResponseLayout {
        let spaces = OrbitalSpaces {
            n_core: 2,
            n_actv: 3,
            n_virt: 4,
        };
        ResponseLayout::new(&spaces, 5)
    }

    #[test]
    fn offsets_follow_the_block_order() {
        let l = layout();
        assert_eq!(l.offset("vc"), 0);
        assert_eq!(l.offset("ca"), 8);
        assert_eq!(l.offset("va"), 14);
        assert_eq!(l.offset("aa"), 26);
        assert_eq!(l.offset("ci"), 29);
        assert_eq!(l.dim, 34);
    }

    #[test]
    fn pack_unpack_round_trip() {
        let l = layout();
        let mut x: Array1<f64> = Array1::zeros(l.dim);
        let vc: Array2<f64> =
            Array2::from_shape_fn((4, 2), |(i, j)| (i * 2 + j) as f64 + 0.5);
        let mut aa: Array2<f64> = Array2::zeros((3, 3));
        aa[[1, 0]] = 5.0;
        aa[[2, 0]] = 7.0;
        aa[[2, 1]] = 9.0;
        let ci: Array1<f64> = array![1.0, -2.0, 3.0, -4.0, 5.0];
        l.pack_orb("vc", vc.view(), &mut x);
        l.pack_orb("aa", aa.view(), &mut x);
        l.pack_ci(ci.view(), &mut x);
        assert_eq!(l.unpack_orb("vc", x.view()), vc);
        assert_eq!(l.unpack_orb("aa", x.view()), aa);
        assert_eq!(l.unpack_ci(x.view()), ci);
    }

    #[test]
    fn antisymmetric_completion() {
        let l = layout();
        let mut x: Array1<f64> = Array1::zeros(l.dim);
        // packed active-active values of a three-orbital active space
        x[l.offset("aa")] = 5.0;
        x[l.offset("aa") + 1] = 7.0;
        x[l.offset("aa") + 2] = 9.0;
        let mut aa: Array2<f64> = l.unpack_orb("aa", x.view());
        antisymmetrize(&mut aa);
        assert_eq!(aa[[1, 0]], 5.0);
        assert_eq!(aa[[2, 0]], 7.0);
        assert_eq!(aa[[2, 1]], 9.0);
        assert_eq!(aa[[0, 1]], -5.0);
        assert_eq!(aa[[0, 2]], -7.0);
        assert_eq!(aa[[1, 2]], -9.0);
        assert_eq!(aa[[0, 0]], 0.0);
        assert_eq!(aa[[1, 1]], 0.0);
        assert_eq!(aa[[2, 2]], 0.0);
    }

    #[test]
    fn empty_active_space_is_allowed() {
        let spaces = OrbitalSpaces {
            n_core: 2,
            n_actv: 0,
            n_virt: 3,
        };
        let l = ResponseLayout::new(&spaces, 2);
        assert_eq!(l.offset("vc"), 0);
        assert_eq!(l.offset("ca"), 6);
        assert_eq!(l.offset("va"), 6);
        assert_eq!(l.offset("aa"), 6);
        assert_eq!(l.offset("ci"), 6);
        assert_eq!(l.dim, 8);
    }

    #[test]
    #[should_panic]
    fn wrong_block_shape_fails_fast() {
        let l = layout();
        let mut x: Array1<f64> = Array1::zeros(l.dim);
        let bad: Array2<f64> = Array2::zeros((3, 3));
        l.pack_orb("vc", bad.view(), &mut x);
    }
}
