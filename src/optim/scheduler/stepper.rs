//! Iteration-driven annealing

use super::Annealer;

/// Steps per-group values from `start` to `end` over `n_iter` iterations
#[derive(Debug, Clone)]
pub struct Stepper {
    start: Vec<f32>,
    end: Vec<f32>,
    n_iter: usize,
    n: usize,
    annealer: Annealer,
}

impl Stepper {
    /// `end` is broadcast when it holds a single value; `n_iter` is at least 1
    pub fn new(start: Vec<f32>, end: Vec<f32>, n_iter: usize, annealer: Annealer) -> Self {
        let end = if end.len() == 1 && start.len() > 1 { vec![end[0]; start.len()] } else { end };
        Self { start, end, n_iter: n_iter.max(1), n: 0, annealer }
    }

    pub fn scalar(start: f32, end: f32, n_iter: usize, annealer: Annealer) -> Self {
        Self::new(vec![start], vec![end], n_iter, annealer)
    }

    pub fn start(&self) -> &[f32] {
        &self.start
    }

    pub fn end(&self) -> &[f32] {
        &self.end
    }

    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    /// Advance one iteration and return the new values
    pub fn step(&mut self) -> Vec<f32> {
        self.n += 1;
        let pct = self.n as f32 / self.n_iter as f32;
        self.start
            .iter()
            .zip(&self.end)
            .map(|(&s, &e)| self.annealer.anneal(s, e, pct))
            .collect()
    }

    pub fn is_done(&self) -> bool {
        self.n >= self.n_iter
    }
}
