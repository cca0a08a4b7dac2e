use chrono::{Datelike, Local};
use std::env;
use tracing::{error, info, warn};
use verbenas::agenda::export::compose_week_export;
use verbenas::agenda::stats::StatsViewState;
use verbenas::config::env_loader::load_config;
use verbenas::dashboard::{Dashboard, ViewState};
use verbenas::firebase::api::FirebaseAPI;
use verbenas::gemini::api::GeminiAPI;
use verbenas::geocoding::api::NominatimAPI;
use verbenas::tracing::setup_loki;

#[tokio::main]
async fn main() {
    let loki = setup_loki().await;
    let config = load_config();

    info!("Starting with {:?}", config);

    let firebase = FirebaseAPI::new(&config.firebase);
    let mut events = match firebase.get_events().await {
        Ok(events) => events,
        Err(err) => {
            error!("Couldn't load events: {}", err);
            return;
        }
    };

    if let Some(limit) = config.debug_config.event_limit {
        events.truncate(limit);
    }

    let now = Local::now().naive_local();
    let today = now.date();
    let view = ViewState {
        stats: StatsViewState {
            selected_year: today.year(),
            screen_size: config.screen_size,
        },
        lookback_days: config.lookback_days,
        stats_expanded: true,
        festival_selection_visible: true,
    };

    match firebase.get_visit_count().await {
        Ok(count) => info!("{} visits so far", count),
        Err(err) => warn!("Couldn't read the visit counter: {}", err),
    }

    let dashboard = Dashboard::build(&events, today, &view);

    info!("Last update: {}", dashboard.last_update);

    for day in &dashboard.days {
        info!("{} ({} verbenas)", day.heading, day.events.len());
    }

    for festival in &dashboard.festivals {
        info!("Verbenas de {}", festival);
    }

    if let Some(statistics) = &dashboard.statistics {
        for (position, (performer, count)) in statistics.top_performers().iter().enumerate() {
            info!("#{} {}: {}", position + 1, performer, count);
        }
    }

    let week = compose_week_export(&events, today);

    if week.is_empty() {
        warn!("No hay eventos programados para el período seleccionado");
    } else {
        info!("{} ready:\n{}", week.file_name, week);
    }

    if !config.debug_config.skip_geocoding {
        let geocoder = NominatimAPI::new(config.geocoding.clone());
        let markers = geocoder
            .load_markers(&events, today, config.lookback_days)
            .await;

        info!("Placed {} markers on the map", markers.len());
    }

    if let (Some(gemini), Ok(question)) = (config.gemini.clone(), env::var("VERBENAS_QUESTION")) {
        match GeminiAPI::new(gemini).ask(&events, &question).await {
            Ok(answer) => info!("{}", answer),
            Err(err) => warn!("{}", err),
        }
    }

    if config.watch {
        let mut subscription = firebase.subscribe();

        while let Some(snapshot) = subscription.changed().await {
            let today = Local::now().date_naive();
            let dashboard = Dashboard::build(&snapshot, today, &view);

            info!(
                "Snapshot with {} events, {} days listed, last update {}",
                snapshot.len(),
                dashboard.days.len(),
                dashboard.last_update
            );
        }
    }

    if let Some((controller, handle)) = loki {
        controller.shutdown().await;
        let _ = handle.await;
    }
}
