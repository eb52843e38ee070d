//! Assignment configuration.

use pax_core::Time;

/// How realised itineraries are cleaned of repeated visits.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CycleMode {
    /// Leave itineraries as sampled.
    KeepCycles,
    /// Remove revisits of the same stop.
    RemoveStopCycles,
    /// Remove revisits of the same station (stops clustered by walking
    /// adjacency).
    #[default]
    RemoveStationCycles,
}

/// Which decision model maps PAT vectors to choice weights.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DecisionModelKind {
    #[default]
    Linear,
    Logit,
    Kirchhoff,
    RelativeLogit,
    Optimal,
}

/// How demand departure-time windows translate into initial choices.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DepartureTimeChoice {
    /// Pick a departure inside the window via the decision model; no
    /// adaptation outside the window.
    #[default]
    NoAdaption,
    /// Allow departures up to `max_adaptation_time` outside the window, at a
    /// linear cost of `adaptation_cost` per second beyond `adaptation_offset`.
    WithAdaption,
    /// Alias of `NoAdaption` in the assignment itself; kept distinct for
    /// downstream reporting.
    Uniform,
    /// Deterministic rooftop model over the departure-time axis.
    Rooftop,
    /// Like `WithAdaption` but with a Box-Cox transformed adaptation cost
    /// (`adaptation_beta`, `adaptation_lambda`).
    BoxCox,
}

/// All tunables of one assignment run.
///
/// Defaults mirror a production-calibrated configuration: station-level cycle
/// removal, a 100x passenger multiplier for sampling resolution, five-minute
/// transfer penalty and delay tolerance, and walking weighted at three times
/// its nominal duration (`1 + walking_costs`).
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Settings {
    pub cycle_mode: CycleMode,

    /// Seed of the Monte Carlo sampling.  Workers derive their streams from
    /// this and their worker index.
    pub random_seed: u64,
    /// Every demand entry's passenger count is scaled by this factor before
    /// sampling, refining the resolution of fractional splits.
    pub passenger_multiplier: u64,
    /// May demand originate directly at stops?
    pub allow_departure_stops: bool,

    /// PAT overhead for changing vehicles, in seconds.
    pub transfer_costs: Time,
    /// Cost factor for walking time: walking counts `1 + walking_costs` times.
    pub walking_costs: f64,
    /// Cost factor for waiting time: waiting counts `1 + waiting_costs` times.
    pub waiting_costs: f64,

    pub decision_model: DecisionModelKind,
    /// Shape parameter for `Logit`, `RelativeLogit` and `Kirchhoff`.
    pub beta: f64,
    /// Maximum PAT distance from the optimum at which an option still
    /// receives probability mass, in seconds.
    pub delay_tolerance: i64,
    /// `Linear` only: PAT overhead granted to non-optimal options.
    pub delay_value: i64,

    /// Maximum vehicle delay assumed by the delay-weighted profile
    /// evaluation, in seconds.
    pub max_delay: Time,

    /// Bucket width for demand-window discretisation; negative disables.
    pub demand_interval_split_time: Time,
    pub keep_demand_intervals: bool,
    pub include_interval_border: bool,

    pub departure_time_choice: DepartureTimeChoice,
    /// Maximum departure shift outside the demand window, in seconds.
    pub max_adaptation_time: Time,
    /// `WithAdaption`/`Rooftop`: cost factor per second of adaptation.
    pub adaptation_cost: f64,
    /// `WithAdaption`: adaptation up to this many seconds is free.
    pub adaptation_offset: Time,
    /// `BoxCox`: beta of the Box-Cox transform.
    pub adaptation_beta: f64,
    /// `BoxCox`: lambda of the Box-Cox transform.
    pub adaptation_lambda: f64,

    /// Apply the arrival stop's minimum transfer time as a buffer on walking
    /// transfers too, not only on same-stop transfers.
    pub use_transfer_buffer_times: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cycle_mode: CycleMode::default(),
            random_seed: 42,
            passenger_multiplier: 100,
            allow_departure_stops: true,
            transfer_costs: 5 * 60,
            walking_costs: 2.0,
            waiting_costs: 0.0,
            decision_model: DecisionModelKind::default(),
            beta: 1.0,
            delay_tolerance: 5 * 60,
            delay_value: 5 * 60,
            max_delay: 0,
            demand_interval_split_time: 86_400,
            keep_demand_intervals: true,
            include_interval_border: false,
            departure_time_choice: DepartureTimeChoice::default(),
            max_adaptation_time: 0,
            adaptation_cost: 2.0,
            adaptation_offset: 0,
            adaptation_beta: 0.1,
            adaptation_lambda: 2.0,
            use_transfer_buffer_times: false,
        }
    }
}
