use std::collections::VecDeque;

use crate::drivers::AcquisitionError;

/// Display-ready view of the window, oldest sample first.
#[derive(Clone, Debug, PartialEq)]
pub struct WindowFrame {
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
}

impl WindowFrame {
    pub fn len(&self) -> usize {
        self.ys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ys.is_empty()
    }

    pub fn points(&self) -> Vec<[f64; 2]> {
        self.xs.iter().zip(&self.ys).map(|(x, y)| [*x, *y]).collect()
    }
}

/// Fixed-capacity FIFO holding the most recent samples.
#[derive(Debug)]
pub struct SlidingWindow {
    values: VecDeque<f64>,
    capacity: usize,
}

impl SlidingWindow {
    pub fn with_capacity(capacity: usize) -> Result<Self, AcquisitionError> {
        let mut window = Self {
            values: VecDeque::new(),
            capacity: 1,
        };
        window.reset(capacity as i64)?;
        Ok(window)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Drops all samples and reallocates for `capacity`. On error the window is untouched.
    pub fn reset(&mut self, capacity: i64) -> Result<(), AcquisitionError> {
        if capacity <= 0 {
            return Err(AcquisitionError::InvalidCapacity {
                requested: capacity,
                max: usize::MAX,
            });
        }
        self.capacity = capacity as usize;
        self.values = VecDeque::with_capacity(self.capacity);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// Replaces the contents with the newest `capacity` entries of `values`.
    pub fn load_all(&mut self, values: &[f64]) {
        let skip = values.len().saturating_sub(self.capacity);
        self.values.clear();
        self.values.extend(&values[skip..]);
    }

    pub fn push(&mut self, value: f64) {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    pub fn values(&self) -> Vec<f64> {
        self.values.iter().copied().collect()
    }

    /// Pairs sample `i` with `i * period_secs` for the x-axis.
    pub fn snapshot(&self, period_secs: f64) -> WindowFrame {
        let xs = (0..self.values.len()).map(|i| i as f64 * period_secs).collect();
        WindowFrame {
            xs,
            ys: self.values(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    #[test]
    fn push_keeps_last_capacity_values_in_order() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let capacity = rng.gen_range(1..40usize);
            let input: Vec<f64> = (0..rng.gen_range(0..100))
                .map(|_| rng.gen_range(-1.0..1.0))
                .collect();
            let mut window = SlidingWindow::with_capacity(capacity).unwrap();
            for v in &input {
                window.push(*v);
            }
            let keep = capacity.min(input.len());
            assert_eq!(window.values(), input[input.len() - keep..].to_vec());
        }
    }

    #[test]
    fn load_all_takes_tail_and_is_idempotent() {
        let mut window = SlidingWindow::with_capacity(3).unwrap();
        let input = [1.0, 2.0, 3.0, 4.0, 5.0];
        window.load_all(&input);
        let first = window.snapshot(1.0);
        window.load_all(&input);
        assert_eq!(window.snapshot(1.0), first);
        assert_eq!(first.ys, vec![3.0, 4.0, 5.0]);
    }

    #[test]
    fn non_positive_capacity_is_rejected_without_touching_contents() {
        let mut window = SlidingWindow::with_capacity(4).unwrap();
        window.push(1.5);
        assert!(matches!(
            window.reset(0),
            Err(AcquisitionError::InvalidCapacity { requested: 0, .. })
        ));
        assert!(window.reset(-3).is_err());
        assert_eq!(window.capacity(), 4);
        assert_eq!(window.values(), vec![1.5]);
    }

    #[test]
    fn snapshot_scales_x_axis_by_period() {
        let mut window = SlidingWindow::with_capacity(5).unwrap();
        window.load_all(&[0.1, 0.2, 0.3]);
        let frame = window.snapshot(2.0);
        assert_eq!(frame.xs, vec![0.0, 2.0, 4.0]);
        assert_eq!(frame.points()[2], [4.0, 0.3]);
    }
}
