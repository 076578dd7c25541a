// This file is part of resid-rs.
// Copyright (c) 2017-2019 Sebastian Jastrzebski <sebby2k@gmail.com>. All rights reserved.
// Portions (c) 2004 Dag Lem <resid@nimrod.no>
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

//! Cubic Hermite interpolation of measured curves.
//!
//! The point list follows the reSID convention: the first and last points are
//! repeated, and a repeated interior x value marks a discontinuity. Each
//! segment gets its tangents from the neighbouring points and those tangents
//! are then limited (Fritsch-Carlson) so a monotone point set yields a
//! monotone curve.

/// A control point of an interpolated curve.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    /// Abscissa (table index for cutoff curves).
    pub x: f64,
    /// Ordinate.
    pub y: f64,
}

impl Point {
    /// Convenience constructor for integer curve data.
    pub fn new(x: i32, y: i32) -> Self {
        Point {
            x: f64::from(x),
            y: f64::from(y),
        }
    }
}

/// Writes interpolated values into an integer table indexed by x.
///
/// Negative values are stored as zero and indices outside the table are
/// ignored.
pub struct PointPlotter<'a> {
    output: &'a mut [i32],
}

impl<'a> PointPlotter<'a> {
    /// Plot into `output`.
    pub fn new(output: &'a mut [i32]) -> Self {
        PointPlotter { output }
    }

    /// Store `y` at index `x`.
    #[inline]
    pub fn plot(&mut self, x: f64, y: f64) {
        if x < 0.0 {
            return;
        }
        if let Some(slot) = self.output.get_mut(x as usize) {
            *slot = if y > 0.0 { (y + 0.5) as i32 } else { 0 };
        }
    }
}

/// Limit segment tangents so the Hermite cubic cannot overshoot.
fn limit_tangents(slope: f64, k1: f64, k2: f64) -> (f64, f64) {
    if slope == 0.0 {
        return (0.0, 0.0);
    }
    let alpha = (k1 / slope).max(0.0);
    let beta = (k2 / slope).max(0.0);
    let norm = alpha * alpha + beta * beta;
    if norm > 9.0 {
        let tau = 3.0 / norm.sqrt();
        (tau * alpha * slope, tau * beta * slope)
    } else {
        (alpha * slope, beta * slope)
    }
}

fn plot_segment(p1: Point, p2: Point, k1: f64, k2: f64, plotter: &mut PointPlotter, res: f64) {
    let h = p2.x - p1.x;
    let mut x = p1.x;
    while x <= p2.x {
        let t = (x - p1.x) / h;
        let t2 = t * t;
        let t3 = t2 * t;
        let y = (2.0 * t3 - 3.0 * t2 + 1.0) * p1.y
            + (t3 - 2.0 * t2 + t) * h * k1
            + (-2.0 * t3 + 3.0 * t2) * p2.y
            + (t3 - t2) * h * k2;
        plotter.plot(x, y);
        x += res;
    }
}

/// Interpolate `points` with step `res`, plotting every evaluated x.
///
/// Segments of zero width are skipped; at least four points are needed to
/// produce any output.
pub fn interpolate(points: &[Point], plotter: &mut PointPlotter, res: f64) {
    for window in points.windows(4) {
        let (p0, p1, p2, p3) = (window[0], window[1], window[2], window[3]);
        if p1.x == p2.x {
            continue;
        }
        let slope = (p2.y - p1.y) / (p2.x - p1.x);
        let (k1, k2) = if p0.x == p1.x && p2.x == p3.x {
            (slope, slope)
        } else if p0.x == p1.x {
            let k2 = (p3.y - p1.y) / (p3.x - p1.x);
            ((3.0 * slope - k2) / 2.0, k2)
        } else if p2.x == p3.x {
            let k1 = (p2.y - p0.y) / (p2.x - p0.x);
            (k1, (3.0 * slope - k1) / 2.0)
        } else {
            (
                (p2.y - p0.y) / (p2.x - p0.x),
                (p3.y - p1.y) / (p3.x - p1.x),
            )
        };
        let (k1, k2) = limit_tangents(slope, k1, k2);
        plot_segment(p1, p2, k1, k2, plotter, res);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn straight_line_is_reproduced() {
        let points = [
            Point::new(0, 0),
            Point::new(0, 0),
            Point::new(10, 100),
            Point::new(10, 100),
        ];
        let mut out = [0i32; 11];
        interpolate(&points, &mut PointPlotter::new(&mut out), 1.0);
        for (x, &y) in out.iter().enumerate() {
            assert_eq!(y, x as i32 * 10, "x = {}", x);
        }
    }

    #[test]
    fn repeated_interior_point_makes_a_step() {
        let points = [
            Point::new(0, 100),
            Point::new(0, 100),
            Point::new(4, 500),
            Point::new(4, 500),
            Point::new(5, 200),
            Point::new(5, 200),
            Point::new(9, 400),
            Point::new(9, 400),
        ];
        let mut out = [0i32; 10];
        interpolate(&points, &mut PointPlotter::new(&mut out), 1.0);
        assert_eq!(out[4], 500);
        assert_eq!(out[5], 200);
    }

    #[test]
    fn negative_values_plot_as_zero() {
        let mut out = [7i32; 2];
        let mut plotter = PointPlotter::new(&mut out);
        plotter.plot(0.0, -3.0);
        plotter.plot(5.0, 1.0);
        plotter.plot(-1.0, 1.0);
        assert_eq!(out, [0, 7]);
    }
}
