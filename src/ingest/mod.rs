/// Upstream data sources.
///
/// Submodules:
/// - `fronius`: realtime power-flow and meter data from Fronius inverters.

pub mod fronius;
