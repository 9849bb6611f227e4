/// Perpendicular distance from `p` to the segment `a`-`b`; the point distance when `a == b`.
fn segment_distance(p: [i32; 2], a: [i32; 2], b: [i32; 2]) -> f64 {
    let (px, py) = (p[0] as f64, p[1] as f64);
    let (ax, ay) = (a[0] as f64, a[1] as f64);
    let (bx, by) = (b[0] as f64, b[1] as f64);
    let (dx, dy) = (bx - ax, by - ay);
    let len = (dx * dx + dy * dy).sqrt();
    if len == 0.0 {
        return ((px - ax).powi(2) + (py - ay).powi(2)).sqrt();
    }
    ((px - ax) * dy - (py - ay) * dx).abs() / len
}

/// Simplify the open chain `points[first..=last]`, marking kept vertices in `keep`.
fn simplify_chain(points: &[[i32; 2]], first: usize, last: usize, epsilon: f64, keep: &mut [bool]) {
    keep[first] = true;
    keep[last] = true;

    let mut stack = vec![(first, last)];
    while let Some((start, end)) = stack.pop() {
        if end <= start + 1 {
            continue;
        }

        let (index, max_dist) = (start + 1..end)
            .map(|i| (i, segment_distance(points[i], points[start], points[end])))
            .fold((start, -1.0), |acc, cur| if cur.1 > acc.1 { cur } else { acc });

        if max_dist > epsilon {
            keep[index] = true;
            stack.push((start, index));
            stack.push((index, end));
        }
    }
}

/// Approximate a polygonal curve with the Ramer-Douglas-Peucker algorithm.
///
/// # Arguments
///
/// * `contour` - The input vertices.
/// * `epsilon` - Maximum distance between the curve and its approximation.
/// * `closed` - Whether the curve is closed (last vertex connected to the first).
///
/// # Returns
///
/// The kept vertices, in input order.
///
/// # Example
///
/// ```
/// use recon_imgproc::polygon::approx_poly_dp;
///
/// let line = [[0, 0], [1, 0], [2, 0], [3, 0]];
/// assert_eq!(approx_poly_dp(&line, 0.5, false), vec![[0, 0], [3, 0]]);
/// ```
pub fn approx_poly_dp(contour: &[[i32; 2]], epsilon: f64, closed: bool) -> Vec<[i32; 2]> {
    let n = contour.len();
    if n < 3 {
        return contour.to_vec();
    }

    let mut keep = vec![false; n];

    if closed {
        // split the ring at the vertex farthest from the first one
        let far = (1..n)
            .max_by(|&a, &b| {
                let da = segment_distance(contour[a], contour[0], contour[0]);
                let db = segment_distance(contour[b], contour[0], contour[0]);
                da.total_cmp(&db).then(b.cmp(&a))
            })
            .unwrap_or(1);

        simplify_chain(contour, 0, far, epsilon, &mut keep);

        // second half wraps around back to the first vertex
        let mut ring: Vec<[i32; 2]> = contour[far..].to_vec();
        ring.push(contour[0]);
        let mut ring_keep = vec![false; ring.len()];
        let ring_last = ring.len() - 1;
        simplify_chain(&ring, 0, ring_last, epsilon, &mut ring_keep);
        for (i, kept) in ring_keep.iter().enumerate().take(ring_last) {
            if *kept {
                keep[far + i] = true;
            }
        }
    } else {
        simplify_chain(contour, 0, n - 1, epsilon, &mut keep);
    }

    contour
        .iter()
        .zip(keep)
        .filter_map(|(p, k)| k.then_some(*p))
        .collect()
}

/// Search for an approximation tolerance that yields a closed polygon with exactly `sides`
/// vertices, by bisection between `min_epsilon` and `max_epsilon`.
///
/// When the midpoint approximation has too few vertices the search continues on
/// `(min, mid)`. When it has too many, it continues on `(mid, min)`, mirroring the
/// historical behaviour of this search, which moves towards smaller tolerances.
/// The search gives up after `max_depth` bisections.
///
/// # Returns
///
/// The polygon vertices, or `None` when no tolerance in the explored range produces
/// exactly `sides` vertices.
pub fn approx_poly_sides(
    contour: &[[i32; 2]],
    min_epsilon: f64,
    max_epsilon: f64,
    sides: usize,
    max_depth: usize,
) -> Option<Vec<[i32; 2]>> {
    let (mut lo, mut hi) = (min_epsilon, max_epsilon);

    for _ in 0..=max_depth {
        let poly_lo = approx_poly_dp(contour, lo, true);
        let poly_hi = approx_poly_dp(contour, hi, true);

        if poly_lo.len() > sides && poly_hi.len() > sides {
            return None;
        }
        if poly_lo.len() < sides && poly_hi.len() < sides {
            return None;
        }
        if poly_lo.len() == sides {
            return Some(poly_lo);
        }
        if poly_hi.len() == sides {
            return Some(poly_hi);
        }

        let mid = (lo + hi) / 2.0;
        let poly_mid = approx_poly_dp(contour, mid, true);
        if poly_mid.len() == sides {
            return Some(poly_mid);
        }

        if poly_mid.len() < sides {
            hi = mid;
        } else {
            // argument order is swapped on this branch
            (lo, hi) = (mid, lo);
        }
    }

    log::debug!("approx_poly_sides: no {sides}-gon within {max_depth} bisections");
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A square outline with intermediate points along each edge and a small bump.
    fn noisy_square() -> Vec<[i32; 2]> {
        let mut contour = Vec::new();
        for x in 0..20 {
            contour.push([x, 0]);
        }
        for y in 0..20 {
            contour.push([20, y]);
        }
        for x in (1..=20).rev() {
            contour.push([x, 20]);
        }
        for y in (1..=20).rev() {
            contour.push([0, y]);
        }
        // small bump on the top edge
        contour[10] = [10, 1];
        contour
    }

    #[test]
    fn approx_open_line() {
        let line = [[0, 0], [5, 1], [10, 0]];
        assert_eq!(approx_poly_dp(&line, 2.0, false), vec![[0, 0], [10, 0]]);
        assert_eq!(approx_poly_dp(&line, 0.5, false), line.to_vec());
    }

    #[test]
    fn approx_closed_square() {
        let poly = approx_poly_dp(&noisy_square(), 2.0, true);
        assert_eq!(poly.len(), 4);
        for corner in [[0, 0], [20, 0], [20, 20], [0, 20]] {
            assert!(poly.contains(&corner));
        }
    }

    #[test]
    fn approx_closed_keeps_bump_with_small_epsilon() {
        let poly = approx_poly_dp(&noisy_square(), 0.5, true);
        assert!(poly.contains(&[10, 1]));
        assert!(poly.len() > 4);
    }

    #[test]
    fn approx_sides_found_at_bound() {
        let poly = approx_poly_sides(&noisy_square(), 0.1, 100.0, 4, 16);
        // neither bound gives a square, the bisection narrows down towards it
        assert_eq!(poly.map(|p| p.len()), Some(4));

        let poly = approx_poly_sides(&noisy_square(), 2.0, 5.0, 4, 16);
        assert_eq!(poly.map(|p| p.len()), Some(4));
    }

    #[test]
    fn approx_sides_out_of_range() {
        // every tolerance in the range keeps more than three vertices
        assert_eq!(approx_poly_sides(&noisy_square(), 0.5, 2.0, 3, 16), None);
    }
}
