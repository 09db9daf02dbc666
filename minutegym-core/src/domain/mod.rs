//! Domain types shared by the data pipeline and the simulator.

pub mod bar;

pub use bar::{BarValues, MinuteBar, OhlcvSeries, SeriesError};
