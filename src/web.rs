use std::collections::BTreeMap;

use actix_web::{middleware, web, App, HttpResponse, HttpServer, Result};
use serde::Serialize;

use crate::display::{plan_rows, quality_distribution, unscheduled_rows, PlanRow, UnscheduledRow};
use crate::roster::Roster;
use crate::schedule::{LegacyFailure, OptimizationStats, SeasonOutcome, TrainerStats};

/// The finished plan, rendered once and served read-only.
pub struct AppState {
    pub rows: Vec<PlanRow>,
    pub unscheduled: Vec<UnscheduledRow>,
    pub stats: StatsResponse,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    weeks: usize,
    assignments: usize,
    average_quality: f64,
    quality_distribution: QualityDistribution,
    legacy_placed_full: usize,
    legacy_placed_partial: usize,
    legacy_failures: BTreeMap<LegacyFailure, usize>,
    optimization: OptimizationStats,
    trainers: TrainerStats,
    dangling_wishes: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct QualityDistribution {
    excellent: usize,
    good: usize,
    average: usize,
    below: usize,
}

impl AppState {
    pub fn new(outcome: &SeasonOutcome, roster: &Roster) -> Self {
        let plan = &outcome.plan;
        let [excellent, good, average, below] = quality_distribution(plan);
        Self {
            rows: plan_rows(plan, roster),
            unscheduled: unscheduled_rows(plan, roster),
            stats: StatsResponse {
                weeks: plan.weeks.len(),
                assignments: plan.len(),
                average_quality: plan.average_score(),
                quality_distribution: QualityDistribution {
                    excellent,
                    good,
                    average,
                    below,
                },
                legacy_placed_full: outcome.legacy.placed_full,
                legacy_placed_partial: outcome.legacy.placed_partial,
                legacy_failures: outcome.legacy.failures.clone(),
                optimization: outcome.optimization.clone(),
                trainers: outcome.trainers.clone(),
                dangling_wishes: roster.dangling_wishes(),
            },
        }
    }
}

async fn get_plan(state: web::Data<AppState>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(&state.rows))
}

async fn get_week(week: web::Path<u32>, state: web::Data<AppState>) -> Result<HttpResponse> {
    let week = week.into_inner();
    let rows: Vec<&PlanRow> = state.rows.iter().filter(|row| row.week == week).collect();
    if rows.is_empty() {
        return Ok(HttpResponse::NotFound().json(serde_json::json!({"error": format!("No assignments in week {}", week)})));
    }
    Ok(HttpResponse::Ok().json(rows))
}

async fn get_unscheduled(week: web::Path<u32>, state: web::Data<AppState>) -> Result<HttpResponse> {
    let week = week.into_inner();
    let rows: Vec<&UnscheduledRow> = state.unscheduled.iter().filter(|row| row.week == week).collect();
    Ok(HttpResponse::Ok().json(rows))
}

async fn get_stats(state: web::Data<AppState>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(&state.stats))
}

fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/plan", web::get().to(get_plan))
        .route("/api/plan/week/{week}", web::get().to(get_week))
        .route("/api/unscheduled/{week}", web::get().to(get_unscheduled))
        .route("/api/stats", web::get().to(get_stats));
}

pub async fn start_server(port: u16, state: AppState) -> std::io::Result<()> {
    let app_state = web::Data::new(state);

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .wrap(middleware::Logger::default())
            .configure(routes)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
