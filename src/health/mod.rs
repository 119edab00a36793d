// Backend reachability — tiered probing with observable connection state.

pub mod monitor;
