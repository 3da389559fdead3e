pub mod observer;

pub use observer::{ConnectivityEvent, ConnectivityObserver};
