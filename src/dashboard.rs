use crate::agenda::aggregation::{
    filter_recent, group_by_day, last_update, sort_by_instant, unique_festivals,
};
use crate::agenda::locale::day_heading;
use crate::agenda::model::{Event, Festival};
use crate::agenda::stats::{available_years, PerformerStatistics, StatsViewState};
use crate::places::full_municipality_name;
use chrono::NaiveDate;
use tracing::{info, instrument};

/// UI state the views depend on, owned by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    pub stats: StatsViewState,
    pub lookback_days: u64,
    pub stats_expanded: bool,
    pub festival_selection_visible: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedEvent {
    pub hora: String,
    pub tipo: String,
    pub lugar: Option<String>,
    pub municipality: String,
    pub orquesta: String,
}

impl From<&Event> for ListedEvent {
    fn from(event: &Event) -> Self {
        Self {
            hora: event.hora.clone(),
            tipo: event.tipo.clone(),
            lugar: event.lugar.clone(),
            municipality: full_municipality_name(&event.municipio).to_string(),
            orquesta: event.orquesta.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedDay {
    pub date: NaiveDate,
    /// "Sábado, 14 de junio de 2025"
    pub heading: String,
    pub events: Vec<ListedEvent>,
}

/// Everything derived from one snapshot for one view state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dashboard {
    pub days: Vec<ListedDay>,
    pub festivals: Vec<Festival>,
    pub years: Vec<i32>,
    pub statistics: Option<PerformerStatistics>,
    pub last_update: String,
}

impl Dashboard {
    #[instrument(skip(events, view), fields(event_count = %events.len()))]
    pub fn build(events: &[Event], today: NaiveDate, view: &ViewState) -> Self {
        let recent = filter_recent(events, today, view.lookback_days);
        let years = available_years(events);

        let days: Vec<ListedDay> = group_by_day(&recent)
            .into_iter()
            .map(|(date, day_events)| ListedDay {
                date,
                heading: day_heading(&date),
                events: sort_by_instant(&day_events).iter().map(ListedEvent::from).collect(),
            })
            .filter(|day| !day.events.is_empty())
            .collect();

        let festivals = if view.festival_selection_visible {
            unique_festivals(events, today)
        } else {
            Vec::new()
        };

        // the collapsed panel shows nothing, and there is nothing to show without years
        let statistics = (view.stats_expanded && !years.is_empty())
            .then(|| PerformerStatistics::compute(events, &view.stats));

        info!("Listing {} days with events", days.len());

        Self {
            days,
            festivals,
            years,
            statistics,
            last_update: last_update(events),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}
