//! Fan triangulation of polygon faces.

/// Decompose a polygon into a triangle fan pivoted at its first index.
///
/// For `[i0, i1, i2, ..., ik]` this yields `(i0, i1, i2), (i0, i2, i3), ...,
/// (i0, i(k-1), ik)`: `n - 2` triangles for an `n`-gon, none for fewer than
/// three indices. A triangle comes back unchanged.
pub fn fan_triangulate(indices: &[u32]) -> Vec<[u32; 3]> {
    let Some((&pivot, rest)) = indices.split_first() else {
        return Vec::new();
    };

    rest.windows(2).map(|w| [pivot, w[0], w[1]]).collect()
}
