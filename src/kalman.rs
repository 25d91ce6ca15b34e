// src/kalman.rs
//
// Recursive estimators used for speed and position smoothing. The 2-D
// position filter keeps a diagonal-only covariance and blends velocity
// heuristically; it is intentionally not a full multivariate Kalman filter.

/// 1-D recursive smoother for noisy scalar measurements.
#[derive(Debug, Clone)]
pub struct ScalarKalman {
    q: f64,
    r: f64,
    x: f64,
    p: f64,
}

impl ScalarKalman {
    /// `q` is the process noise, `r` the measurement noise.
    pub fn new(q: f64, r: f64, initial_value: f64) -> Self {
        Self {
            q,
            r,
            x: initial_value,
            p: 1.0,
        }
    }

    /// Fold in a measurement and return the smoothed value.
    pub fn update(&mut self, measurement: f64) -> f64 {
        let p_pred = self.p + self.q;
        let k = p_pred / (p_pred + self.r);
        self.x += k * (measurement - self.x);
        self.p = (1.0 - k) * p_pred;
        self.x
    }

    pub fn value(&self) -> f64 {
        self.x
    }

    pub fn covariance(&self) -> f64 {
        self.p
    }

    pub fn reset(&mut self, initial_value: f64) {
        self.x = initial_value;
        self.p = 1.0;
    }

    pub fn set_process_noise(&mut self, q: f64) {
        self.q = q;
    }

    pub fn set_measurement_noise(&mut self, r: f64) {
        self.r = r;
    }
}

impl Default for ScalarKalman {
    fn default() -> Self {
        Self::new(0.1, 1.0, 0.0)
    }
}

/// Position/velocity estimator over state `[x, y, vx, vy]`.
///
/// Only the diagonal covariance entries are carried, and velocity is not
/// part of the formal state transition: on each update it is blended
/// 0.9/0.1 with the finite-difference velocity implied by the correction.
#[derive(Debug, Clone)]
pub struct PositionKalman {
    x: [f64; 4],
    p: [f64; 4],
    q: f64,
    r: f64,
    dt: f64,
}

impl PositionKalman {
    pub fn new(initial_x: f64, initial_y: f64, q: f64, r: f64, dt: f64) -> Self {
        Self {
            x: [initial_x, initial_y, 0.0, 0.0],
            p: [1.0; 4],
            q,
            r,
            dt,
        }
    }

    /// Advance position by velocity and inflate the covariance diagonal.
    pub fn predict(&mut self) {
        self.x[0] += self.x[2] * self.dt;
        self.x[1] += self.x[3] * self.dt;
        for p in &mut self.p {
            *p += self.q;
        }
    }

    /// Correct with a measured position.
    pub fn update(&mut self, measured_x: f64, measured_y: f64) {
        let kx = self.p[0] / (self.p[0] + self.r);
        let ky = self.p[1] / (self.p[1] + self.r);

        let dx = measured_x - self.x[0];
        let dy = measured_y - self.x[1];

        self.x[0] += kx * dx;
        self.x[1] += ky * dy;
        self.x[2] = self.x[2] * 0.9 + dx / self.dt * 0.1;
        self.x[3] = self.x[3] * 0.9 + dy / self.dt * 0.1;

        self.p[0] = (1.0 - kx) * self.p[0];
        self.p[1] = (1.0 - ky) * self.p[1];
    }

    pub fn position(&self) -> (f64, f64) {
        (self.x[0], self.x[1])
    }

    pub fn velocity(&self) -> (f64, f64) {
        (self.x[2], self.x[3])
    }

    /// Speed in pixels per second.
    pub fn speed(&self) -> f64 {
        (self.x[2] * self.x[2] + self.x[3] * self.x[3]).sqrt()
    }

    /// Speed converted to km/h via a meters-per-pixel scale.
    pub fn speed_kmh(&self, meters_per_pixel: f64) -> f64 {
        self.speed() * meters_per_pixel * 3.6
    }

    pub fn reset(&mut self, x: f64, y: f64) {
        self.x = [x, y, 0.0, 0.0];
        self.p = [1.0; 4];
    }
}

/// Exponential moving average; the first update seeds the state unmodified.
#[derive(Debug, Clone)]
pub struct EmaFilter {
    value: f64,
    alpha: f64,
    initialized: bool,
}

impl EmaFilter {
    /// Lower `alpha` means stronger smoothing.
    pub fn new(alpha: f64) -> Self {
        Self {
            value: 0.0,
            alpha,
            initialized: false,
        }
    }

    pub fn update(&mut self, new_value: f64) -> f64 {
        if !self.initialized {
            self.value = new_value;
            self.initialized = true;
        } else {
            self.value = self.alpha * new_value + (1.0 - self.alpha) * self.value;
        }
        self.value
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn reset(&mut self) {
        self.value = 0.0;
        self.initialized = false;
    }
}
