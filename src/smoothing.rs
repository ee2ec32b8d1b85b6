//! Freehand stroke smoothing.
//!
//! Raw pointer samples are thinned, then fitted with a parametric cubic smoothing spline
//! (Reinsch form: minimise `sum |p_i - g(t_i)|^2 + lambda * integral |g''|^2` over natural
//! cubic splines `g`) whose `lambda` is chosen so the residual matches a target derived from
//! the smoothing strength. Any numerical trouble falls back to the thinned polyline.

use log::debug;

pub const RESAMPLE_DISTANCE: f32 = 3.0;
pub const HIGH_DENSITY_POINTS: usize = 50;
const TABLET_MULTIPLIER: f64 = 25.0;
const BISECTION_STEPS: usize = 60;

/// How densely the pointer device sampled the stroke.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputDensity {
    /// Stylus/tablet rate: many closely spaced samples.
    High,
    /// Mouse rate.
    Low,
}

impl InputDensity {
    pub fn classify(point_count: usize) -> Self {
        if point_count > HIGH_DENSITY_POINTS {
            InputDensity::High
        } else {
            InputDensity::Low
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StrokeSmoother {
    /// 0 follows the input exactly, 100 smooths hardest.
    pub strength: u8,
}

impl Default for StrokeSmoother {
    fn default() -> Self {
        Self { strength: 50 }
    }
}

impl StrokeSmoother {
    pub fn new(strength: u8) -> Self {
        Self {
            strength: strength.min(100),
        }
    }

    /// Smooth a stroke, guessing the input density from the point count.
    pub fn smooth(&self, points: &[(f32, f32)]) -> Vec<(f32, f32)> {
        self.smooth_as(points, InputDensity::classify(points.len()))
    }

    pub fn smooth_as(&self, points: &[(f32, f32)], density: InputDensity) -> Vec<(f32, f32)> {
        if points.len() < 3 {
            return points.to_vec();
        }
        let thinned = match density {
            InputDensity::High => resample(points, RESAMPLE_DISTANCE),
            InputDensity::Low if points.len() > HIGH_DENSITY_POINTS => decimate(points),
            InputDensity::Low => points.to_vec(),
        };
        let distinct = dedup(&thinned);
        if distinct.len() == 1 {
            return distinct;
        }

        let strength = self.strength as f64 / 100.0;
        let target = match density {
            InputDensity::High => strength * TABLET_MULTIPLIER,
            InputDensity::Low => strength * thinned.len() as f64,
        };
        let samples = 2 * thinned.len();
        match SmoothingSpline::fit(&distinct, target) {
            Some(spline) => spline.sample(samples),
            None => {
                debug!("spline fit unavailable for {} points, using polyline", distinct.len());
                thinned
            }
        }
    }
}

/// Keep points at least `min_distance` apart, adding a midpoint across wide gaps.
pub fn resample(points: &[(f32, f32)], min_distance: f32) -> Vec<(f32, f32)> {
    let Some(&first) = points.first() else {
        return Vec::new();
    };
    let mut out = vec![first];
    let mut last = first;
    for &p in &points[1..] {
        let d = distance(last, p);
        if d > min_distance {
            if d > 2.0 * min_distance {
                out.push(((last.0 + p.0) / 2.0, (last.1 + p.1) / 2.0));
            }
            out.push(p);
            last = p;
        }
    }
    if let Some(&end) = points.last() {
        if end != last {
            out.push(end);
        }
    }
    out
}

/// Every second point, always keeping the final one.
pub fn decimate(points: &[(f32, f32)]) -> Vec<(f32, f32)> {
    let mut out: Vec<_> = points.iter().copied().step_by(2).collect();
    if let Some(&end) = points.last() {
        if out.last() != Some(&end) {
            out.push(end);
        }
    }
    out
}

fn dedup(points: &[(f32, f32)]) -> Vec<(f32, f32)> {
    let mut out: Vec<(f32, f32)> = Vec::with_capacity(points.len());
    for &p in points {
        if out.last() != Some(&p) {
            out.push(p);
        }
    }
    out
}

fn distance(a: (f32, f32), b: (f32, f32)) -> f32 {
    ((b.0 - a.0).powi(2) + (b.1 - a.1).powi(2)).sqrt()
}

/// Natural cubic spline in each coordinate over a shared chord-length parameter.
struct SmoothingSpline {
    knots: Vec<f64>,
    values: [Vec<f64>; 2],
    // second derivatives at the knots; zero at both ends
    curvature: [Vec<f64>; 2],
}

/// Symmetric pentadiagonal system `R + lambda * Q^T Q`, factored as `L D L^T`.
struct BandedFactor {
    d: Vec<f64>,
    l1: Vec<f64>,
    l2: Vec<f64>,
}

impl BandedFactor {
    fn new(diag: &[f64], off1: &[f64], off2: &[f64]) -> Option<Self> {
        let m = diag.len();
        let mut d = vec![0.0; m];
        let mut l1 = vec![0.0; m];
        let mut l2 = vec![0.0; m];
        for k in 0..m {
            let mut dk = diag[k];
            if k >= 1 {
                dk -= l1[k - 1] * l1[k - 1] * d[k - 1];
            }
            if k >= 2 {
                dk -= l2[k - 2] * l2[k - 2] * d[k - 2];
            }
            if !dk.is_finite() || dk <= 0.0 {
                return None;
            }
            d[k] = dk;
            if k + 1 < m {
                let mut v = off1[k];
                if k >= 1 {
                    v -= l2[k - 1] * l1[k - 1] * d[k - 1];
                }
                l1[k] = v / dk;
            }
            if k + 2 < m {
                l2[k] = off2[k] / dk;
            }
        }
        Some(Self { d, l1, l2 })
    }

    fn solve(&self, b: &[f64]) -> Vec<f64> {
        let m = b.len();
        let mut z = vec![0.0; m];
        for k in 0..m {
            let mut v = b[k];
            if k >= 1 {
                v -= self.l1[k - 1] * z[k - 1];
            }
            if k >= 2 {
                v -= self.l2[k - 2] * z[k - 2];
            }
            z[k] = v;
        }
        for k in 0..m {
            z[k] /= self.d[k];
        }
        for k in (0..m).rev() {
            let mut v = z[k];
            if k + 1 < m {
                v -= self.l1[k] * z[k + 1];
            }
            if k + 2 < m {
                v -= self.l2[k] * z[k + 2];
            }
            z[k] = v;
        }
        z
    }
}

/// Per-column nonzeros of `Q` (rows k, k+1, k+2) for interior knot `k + 1`.
fn q_columns(h: &[f64]) -> Vec<[f64; 3]> {
    (0..h.len() - 1)
        .map(|k| {
            let a = 1.0 / h[k];
            let c = 1.0 / h[k + 1];
            [a, -(a + c), c]
        })
        .collect()
}

impl SmoothingSpline {
    /// Fit with total squared residual close to `target`; `None` if the system is degenerate.
    fn fit(points: &[(f32, f32)], target: f64) -> Option<Self> {
        let n = points.len();
        if n < 4 {
            return None;
        }
        let ys: [Vec<f64>; 2] = [
            points.iter().map(|p| p.0 as f64).collect(),
            points.iter().map(|p| p.1 as f64).collect(),
        ];

        let mut knots = Vec::with_capacity(n);
        let mut acc = 0.0;
        knots.push(0.0);
        for w in points.windows(2) {
            acc += distance(w[0], w[1]) as f64;
            knots.push(acc);
        }
        if acc <= 0.0 {
            return None;
        }
        for t in &mut knots {
            *t /= acc;
        }
        let h: Vec<f64> = knots.windows(2).map(|w| w[1] - w[0]).collect();
        if h.iter().any(|&v| v <= 0.0) {
            return None;
        }

        let linear_residual: f64 = ys.iter().map(|y| linear_fit(&knots, y).1).sum();
        if target >= linear_residual {
            let values = [linear_fit(&knots, &ys[0]).0, linear_fit(&knots, &ys[1]).0];
            return Some(Self {
                knots,
                values,
                curvature: [vec![0.0; n], vec![0.0; n]],
            });
        }

        let system = SplineSystem::new(&h, &ys);
        if target <= 0.0 {
            return system.solve(0.0).map(|s| s.into_spline(knots));
        }

        let mut lo = -20.0f64;
        let mut hi = 0.0f64;
        while system.solve(10f64.powf(hi))?.residual < target {
            hi += 2.0;
            if hi > 40.0 {
                break;
            }
        }
        for _ in 0..BISECTION_STEPS {
            let mid = (lo + hi) / 2.0;
            if system.solve(10f64.powf(mid))?.residual < target {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        system
            .solve(10f64.powf((lo + hi) / 2.0))
            .map(|s| s.into_spline(knots))
    }

    /// Evaluate at `count` evenly spaced parameter values in [0, 1].
    fn sample(&self, count: usize) -> Vec<(f32, f32)> {
        let count = count.max(2);
        let last = self.knots.len() - 1;
        let mut seg = 0;
        (0..count)
            .map(|i| {
                let t = i as f64 / (count - 1) as f64;
                while seg + 1 < last && t > self.knots[seg + 1] {
                    seg += 1;
                }
                let x = self.eval(0, seg, t);
                let y = self.eval(1, seg, t);
                (x as f32, y as f32)
            })
            .collect()
    }

    fn eval(&self, axis: usize, i: usize, t: f64) -> f64 {
        let (t0, t1) = (self.knots[i], self.knots[i + 1]);
        let h = t1 - t0;
        let (g0, g1) = (self.values[axis][i], self.values[axis][i + 1]);
        let (c0, c1) = (self.curvature[axis][i], self.curvature[axis][i + 1]);
        let a = t - t0;
        let b = t1 - t;
        (a * g1 + b * g0) / h - a * b / 6.0 * ((1.0 + a / h) * c1 + (1.0 + b / h) * c0)
    }
}

struct SplineSystem<'a> {
    r_diag: Vec<f64>,
    r_off: Vec<f64>,
    qtq: [Vec<f64>; 3],
    q: Vec<[f64; 3]>,
    qty: [Vec<f64>; 2],
    ys: &'a [Vec<f64>; 2],
}

struct SplineSolution {
    values: [Vec<f64>; 2],
    curvature: [Vec<f64>; 2],
    residual: f64,
}

impl<'a> SplineSystem<'a> {
    fn new(h: &[f64], ys: &'a [Vec<f64>; 2]) -> Self {
        let m = h.len() - 1;
        let q = q_columns(h);
        let r_diag = (0..m).map(|k| (h[k] + h[k + 1]) / 3.0).collect();
        let r_off = (0..m).map(|k| if k + 1 < m { h[k + 1] / 6.0 } else { 0.0 }).collect();

        let mut d0 = vec![0.0; m];
        let mut d1 = vec![0.0; m];
        let mut d2 = vec![0.0; m];
        for k in 0..m {
            let [a, b, c] = q[k];
            d0[k] = a * a + b * b + c * c;
            if k + 1 < m {
                d1[k] = b * q[k + 1][0] + c * q[k + 1][1];
            }
            if k + 2 < m {
                d2[k] = c * q[k + 2][0];
            }
        }

        let qty: [Vec<f64>; 2] = [0, 1].map(|axis| {
            let y = &ys[axis];
            (0..m)
                .map(|k| q[k][0] * y[k] + q[k][1] * y[k + 1] + q[k][2] * y[k + 2])
                .collect()
        });

        Self {
            r_diag,
            r_off,
            qtq: [d0, d1, d2],
            q,
            qty,
            ys,
        }
    }

    fn solve(&self, lambda: f64) -> Option<SplineSolution> {
        let m = self.r_diag.len();
        let diag: Vec<f64> = (0..m).map(|k| self.r_diag[k] + lambda * self.qtq[0][k]).collect();
        let off1: Vec<f64> = (0..m).map(|k| self.r_off[k] + lambda * self.qtq[1][k]).collect();
        let off2: Vec<f64> = (0..m).map(|k| lambda * self.qtq[2][k]).collect();
        let factor = BandedFactor::new(&diag, &off1, &off2)?;

        let mut residual = 0.0;
        let mut values: [Vec<f64>; 2] = [Vec::new(), Vec::new()];
        let mut curvature: [Vec<f64>; 2] = [Vec::new(), Vec::new()];
        for axis in 0..2 {
            let gamma = factor.solve(&self.qty[axis]);
            let mut g = self.ys[axis].clone();
            for (k, col) in self.q.iter().enumerate() {
                for (row, q) in col.iter().enumerate() {
                    g[k + row] -= lambda * q * gamma[k];
                }
            }
            residual += g
                .iter()
                .zip(self.ys[axis].iter())
                .map(|(a, b)| (a - b) * (a - b))
                .sum::<f64>();
            if g.iter().chain(gamma.iter()).any(|v| !v.is_finite()) {
                return None;
            }
            let mut full = Vec::with_capacity(m + 2);
            full.push(0.0);
            full.extend_from_slice(&gamma);
            full.push(0.0);
            values[axis] = g;
            curvature[axis] = full;
        }
        Some(SplineSolution {
            values,
            curvature,
            residual,
        })
    }
}

impl SplineSolution {
    fn into_spline(self, knots: Vec<f64>) -> SmoothingSpline {
        SmoothingSpline {
            knots,
            values: self.values,
            curvature: self.curvature,
        }
    }
}

/// Least-squares line through `(t, y)`: fitted values and residual sum of squares.
fn linear_fit(t: &[f64], y: &[f64]) -> (Vec<f64>, f64) {
    let n = t.len() as f64;
    let mean_t = t.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;
    let sxx: f64 = t.iter().map(|v| (v - mean_t).powi(2)).sum();
    let sxy: f64 = t.iter().zip(y).map(|(a, b)| (a - mean_t) * (b - mean_y)).sum();
    let slope = if sxx > 0.0 { sxy / sxx } else { 0.0 };
    let fitted: Vec<f64> = t.iter().map(|v| mean_y + slope * (v - mean_t)).collect();
    let rss = fitted.iter().zip(y).map(|(f, v)| (f - v).powi(2)).sum();
    (fitted, rss)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: (f32, f32), b: (f32, f32), eps: f32) -> bool {
        (a.0 - b.0).abs() <= eps && (a.1 - b.1).abs() <= eps
    }

    #[test]
    fn short_strokes_pass_through() {
        let pts = vec![(1.0, 2.0), (5.0, 9.0)];
        assert_eq!(StrokeSmoother::default().smooth(&pts), pts);
        assert!(StrokeSmoother::default().smooth(&[]).is_empty());
    }

    #[test]
    fn coincident_points_collapse_to_one() {
        let pts = vec![(4.0, 4.0); 12];
        assert_eq!(StrokeSmoother::default().smooth(&pts), vec![(4.0, 4.0)]);
    }

    #[test]
    fn straight_line_stays_straight() {
        let pts: Vec<_> = (0..21).map(|i| (i as f32 * 5.0, 10.0)).collect();
        let out = StrokeSmoother::new(50).smooth(&pts);
        assert_eq!(out.len(), 42);
        assert!(out.iter().all(|p| (p.1 - 10.0).abs() < 1e-3));
        assert!(close(out[0], (0.0, 10.0), 1e-3));
        assert!(close(out[41], (100.0, 10.0), 1e-3));
    }

    #[test]
    fn zero_strength_interpolates_endpoints() {
        let pts = vec![(0.0, 0.0), (10.0, 8.0), (20.0, -3.0), (30.0, 5.0), (40.0, 0.0)];
        let out = StrokeSmoother::new(0).smooth(&pts);
        assert_eq!(out.len(), 10);
        assert!(close(out[0], pts[0], 1e-3));
        assert!(close(out[9], pts[4], 1e-3));
    }

    #[test]
    fn strong_smoothing_flattens_jitter() {
        let pts: Vec<_> = (0..20)
            .map(|i| (i as f32 * 4.0, if i % 2 == 0 { 2.0 } else { -2.0 }))
            .collect();
        let out = StrokeSmoother::new(100).smooth(&pts);
        let mean_abs = out.iter().map(|p| p.1.abs()).sum::<f32>() / out.len() as f32;
        assert!(mean_abs < 1.5, "mean deviation {mean_abs}");
    }

    #[test]
    fn dense_input_is_resampled_by_distance() {
        let pts: Vec<_> = (0..200).map(|i| (i as f32 * 0.5, 0.0)).collect();
        let kept = resample(&pts, RESAMPLE_DISTANCE);
        for w in kept.windows(2).take(kept.len() - 2) {
            assert!(distance(w[0], w[1]) > RESAMPLE_DISTANCE);
        }
        assert_eq!(kept.last(), pts.last());
        assert!(kept.len() < 40);
    }

    #[test]
    fn wide_gaps_get_a_midpoint() {
        let kept = resample(&[(0.0, 0.0), (10.0, 0.0)], RESAMPLE_DISTANCE);
        assert_eq!(kept, vec![(0.0, 0.0), (5.0, 0.0), (10.0, 0.0)]);
    }

    #[test]
    fn decimation_keeps_every_other_point_and_the_end() {
        let pts: Vec<_> = (0..6).map(|i| (i as f32, 0.0)).collect();
        let out = decimate(&pts);
        assert_eq!(out, vec![(0.0, 0.0), (2.0, 0.0), (4.0, 0.0), (5.0, 0.0)]);
    }

    #[test]
    fn tablet_strokes_produce_twice_the_resampled_count() {
        let pts: Vec<_> = (0..120)
            .map(|i| {
                let t = i as f32 * 0.4;
                (t, (t / 6.0).sin() * 10.0)
            })
            .collect();
        let out = StrokeSmoother::new(50).smooth(&pts);
        let resampled = resample(&pts, RESAMPLE_DISTANCE).len();
        assert_eq!(out.len(), 2 * resampled);
        assert!(close(out[0], pts[0], 4.0));
    }
}
