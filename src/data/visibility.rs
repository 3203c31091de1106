//! Calibrated visibility payload for interferometric forward models.
//!
//! A [`VisibilitySet`] holds one [`ObservationBlock`] per execution block. The
//! preparation step in [`VisibilitySet::prepare`] does the channel bookkeeping
//! once per dataset:
//!
//! - map channel frequencies to velocities
//! - trim each block to the fitted velocity window plus `chpad` padding channels
//! - flag censored velocity ranges
//!
//! Predicting model visibilities and computing chi-square is left to the
//! forward model that consumes this payload.

use std::ops::Range;

use nalgebra::{Complex, DMatrix};

use crate::data::inference::{ContextMeta, FitDataOptions, InferenceData};
use crate::error::AppError;
use crate::physics::constants::C_LIGHT;

/// Channel frequencies and their line-of-sight velocities.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelGrid {
    /// Channel frequencies [Hz].
    pub frequency: Vec<f64>,
    /// Channel velocities [m/s], radio convention.
    pub velocity: Vec<f64>,
}

impl ChannelGrid {
    pub fn from_frequencies(frequency: Vec<f64>, restfreq: f64) -> Self {
        let velocity = frequency
            .iter()
            .map(|nu| C_LIGHT * (1.0 - nu / restfreq))
            .collect();
        Self {
            frequency,
            velocity,
        }
    }

    pub fn len(&self) -> usize {
        self.frequency.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequency.is_empty()
    }

    /// Channel indices inside `vra`, widened by `chpad` on each side.
    ///
    /// Returns `None` when no channel falls inside the window.
    pub fn fit_window(&self, vra: (f64, f64), chpad: usize) -> Option<Range<usize>> {
        let (lo, hi) = (vra.0.min(vra.1), vra.0.max(vra.1));
        let inside: Vec<usize> = self
            .velocity
            .iter()
            .enumerate()
            .filter(|(_, v)| **v >= lo && **v <= hi)
            .map(|(i, _)| i)
            .collect();
        let first = *inside.first()?;
        let last = *inside.last()?;
        let start = first.saturating_sub(chpad);
        let end = (last + 1 + chpad).min(self.len());
        Some(start..end)
    }

    fn slice(&self, range: Range<usize>) -> Self {
        Self {
            frequency: self.frequency[range.clone()].to_vec(),
            velocity: self.velocity[range].to_vec(),
        }
    }
}

/// Visibilities from one execution block.
///
/// `vis` and `weights` are `(n_channels, n_baselines)`.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationBlock {
    /// Baseline coordinates [lambda].
    pub u: Vec<f64>,
    pub v: Vec<f64>,
    pub channels: ChannelGrid,
    pub vis: DMatrix<Complex<f64>>,
    pub weights: DMatrix<f64>,
    /// `true` for channels that enter the likelihood.
    pub channel_mask: Vec<bool>,
}

impl ObservationBlock {
    pub fn new(
        u: Vec<f64>,
        v: Vec<f64>,
        channels: ChannelGrid,
        vis: DMatrix<Complex<f64>>,
        weights: DMatrix<f64>,
    ) -> Result<Self, AppError> {
        if u.len() != v.len() {
            return Err(AppError::config(format!(
                "Baseline coordinate lengths differ: u={}, v={}.",
                u.len(),
                v.len()
            )));
        }
        let expected = (channels.len(), u.len());
        if vis.shape() != expected || weights.shape() != expected {
            return Err(AppError::config(format!(
                "Visibility shape {:?} / weight shape {:?} do not match (channels, baselines) = {expected:?}.",
                vis.shape(),
                weights.shape()
            )));
        }
        let channel_mask = vec![true; channels.len()];
        Ok(Self {
            u,
            v,
            channels,
            vis,
            weights,
            channel_mask,
        })
    }

    pub fn nchan(&self) -> usize {
        self.channels.len()
    }

    pub fn nvis(&self) -> usize {
        self.u.len()
    }

    /// Keep only the channels in `range`.
    pub fn select_channels(&self, range: Range<usize>) -> Self {
        let len = range.len();
        Self {
            u: self.u.clone(),
            v: self.v.clone(),
            channels: self.channels.slice(range.clone()),
            vis: self.vis.rows(range.start, len).into_owned(),
            weights: self.weights.rows(range.start, len).into_owned(),
            channel_mask: self.channel_mask[range].to_vec(),
        }
    }

    /// Flag channels whose velocity falls inside any censored range.
    pub fn apply_censoring(&mut self, vcensor: &[(f64, f64)]) {
        for (flag, v) in self.channel_mask.iter_mut().zip(&self.channels.velocity) {
            let censored = vcensor
                .iter()
                .any(|&(a, b)| *v >= a.min(b) && *v <= a.max(b));
            if censored {
                *flag = false;
            }
        }
    }

    /// Number of channels that enter the likelihood.
    pub fn active_channels(&self) -> usize {
        self.channel_mask.iter().filter(|m| **m).count()
    }
}

/// All execution blocks of a dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct VisibilitySet {
    pub blocks: Vec<ObservationBlock>,
}

impl VisibilitySet {
    /// Trim, censor and wrap raw blocks into an inference context.
    ///
    /// Blocks with no channel inside the fitted window are dropped; a dataset with
    /// no usable block is an error.
    pub fn prepare(
        blocks: Vec<ObservationBlock>,
        opts: &FitDataOptions,
        chpad: usize,
    ) -> Result<InferenceData<VisibilitySet>, AppError> {
        let mut kept = Vec::with_capacity(blocks.len());
        for (idx, block) in blocks.into_iter().enumerate() {
            let Some(window) = block.channels.fit_window(opts.vra, chpad) else {
                log::warn!(
                    "Execution block {idx} has no channels in {:.0}..{:.0} m/s; skipping.",
                    opts.vra.0,
                    opts.vra.1
                );
                continue;
            };
            let mut trimmed = block.select_channels(window);
            trimmed.apply_censoring(&opts.vcensor);
            kept.push(trimmed);
        }

        if kept.is_empty() {
            return Err(AppError::config(
                "No execution block has channels inside the fitted velocity range.",
            ));
        }

        let mut meta = ContextMeta::new(opts, kept.len());
        meta.chpad = chpad;
        Ok(InferenceData::new(meta, VisibilitySet { blocks: kept }))
    }

    pub fn total_visibilities(&self) -> usize {
        self.blocks.iter().map(|b| b.active_channels() * b.nvis()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESTFREQ: f64 = 230.538e9;

    fn block(nchan: usize) -> ObservationBlock {
        // Channels from +2 km/s down to -2 km/s in 0.5 km/s steps (frequency increasing).
        let velocities: Vec<f64> = (0..nchan).map(|i| 2.0e3 - 500.0 * i as f64).collect();
        let freqs: Vec<f64> = velocities.iter().map(|v| RESTFREQ * (1.0 - v / C_LIGHT)).collect();
        let channels = ChannelGrid::from_frequencies(freqs, RESTFREQ);
        let nvis = 3;
        let vis = DMatrix::from_fn(nchan, nvis, |i, j| Complex::new(i as f64, j as f64));
        let weights = DMatrix::from_element(nchan, nvis, 1.0);
        ObservationBlock::new(vec![1.0, 2.0, 3.0], vec![0.0, 0.5, 1.0], channels, vis, weights)
            .unwrap()
    }

    #[test]
    fn channel_velocities_follow_radio_convention() {
        let grid = ChannelGrid::from_frequencies(vec![RESTFREQ, RESTFREQ * (1.0 - 1e3 / C_LIGHT)], RESTFREQ);
        assert!(grid.velocity[0].abs() < 1e-6);
        assert!((grid.velocity[1] - 1e3).abs() < 1e-6);
    }

    #[test]
    fn fit_window_pads_and_clips() {
        let b = block(9);
        // Velocities: 2000, 1500, ..., -2000. Window [-500, 500] -> indices 3..=5.
        assert_eq!(b.channels.fit_window((-500.0, 500.0), 0), Some(3..6));
        assert_eq!(b.channels.fit_window((-500.0, 500.0), 2), Some(1..8));
        assert_eq!(b.channels.fit_window((-500.0, 500.0), 10), Some(0..9));
        assert_eq!(b.channels.fit_window((5e3, 6e3), 2), None);
    }

    #[test]
    fn prepare_trims_censors_and_counts_blocks() {
        let opts = FitDataOptions {
            vra: (-500.0, 500.0),
            vcensor: vec![(-100.0, 100.0)],
            restfreq: RESTFREQ,
        };
        let data = VisibilitySet::prepare(vec![block(9), block(9)], &opts, 1).unwrap();
        assert_eq!(data.nobs(), 2);
        assert_eq!(data.meta.chpad, 1);
        let b = &data.payload.blocks[0];
        assert_eq!(b.nchan(), 5);
        assert_eq!(b.vis.shape(), (5, 3));
        assert_eq!(b.vis[(0, 1)], Complex::new(2.0, 1.0));
        // Only the 0 m/s channel is censored.
        assert_eq!(b.active_channels(), 4);
        assert_eq!(data.payload.total_visibilities(), 2 * 4 * 3);
    }

    #[test]
    fn prepare_rejects_datasets_outside_window() {
        let opts = FitDataOptions {
            vra: (9e3, 1e4),
            vcensor: Vec::new(),
            restfreq: RESTFREQ,
        };
        let err = VisibilitySet::prepare(vec![block(5)], &opts, 2).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Config);
    }

    #[test]
    fn block_shape_is_validated() {
        let channels = ChannelGrid::from_frequencies(vec![RESTFREQ; 2], RESTFREQ);
        let vis = DMatrix::from_element(3, 1, Complex::new(0.0, 0.0));
        let weights = DMatrix::from_element(3, 1, 1.0);
        assert!(ObservationBlock::new(vec![0.0], vec![0.0], channels, vis, weights).is_err());
    }
}
