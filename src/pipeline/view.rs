//! One entry point from a user selection to a renderable regional view.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{info, warn};

use crate::error::{PipelineError, Result};
use crate::pipeline::aggregate::{
    DoseScope, daily_dose_totals, national_dose_total, regional_forecast_for_date,
    surveillance_by_region,
};
use crate::pipeline::apportion::{apportion, apportion_forecast, forecast_for_date};
use crate::pipeline::summary::{rank_and_share, sorted_ascending, summarize, top_n};
use crate::pipeline::types::{
    CanonicalRegionTable, RankShare, RegionBounds, RegionValue, RegionalView, SeriesPoint,
};
use crate::regions::{RegionNormalizer, RegionWeights};
use crate::sources::{Datasets, ForecastPoint};

/// Number of regions in the "top regions" table.
pub const TOP_REGIONS: usize = 5;

/// Fixed figures shown when the analyst asks for demonstration data.
static DEMO_VALUES: &[(&str, f64)] = &[
    ("Île-de-France", 85000.0),
    ("Auvergne-Rhône-Alpes", 65000.0),
    ("Occitanie", 55000.0),
    ("Provence-Alpes-Côte d'Azur", 45000.0),
    ("Hauts-de-France", 50000.0),
    ("Nouvelle-Aquitaine", 48000.0),
    ("Grand Est", 42000.0),
    ("Bretagne", 35000.0),
    ("Normandie", 30000.0),
    ("Pays de la Loire", 32000.0),
    ("Centre-Val de Loire", 25000.0),
    ("Bourgogne-Franche-Comté", 28000.0),
    ("Corse", 8000.0),
];

/// What the analyst asked to see.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// National forecast for one date, apportioned by region.
    Forecast { date: NaiveDate },
    /// Forecast already split by region upstream, for one date.
    RegionalForecast { date: NaiveDate },
    /// Mean all-ages SurSaUD rate for one week.
    Surveillance { week: String, metric: String },
    /// National IQVIA total for one series, apportioned by region.
    Doses(DoseScope),
    /// Built-in demonstration figures.
    Demo,
}

impl Selection {
    pub fn title(&self) -> String {
        match self {
            Selection::Forecast { date } => format!("Prophet forecast - {date}"),
            Selection::RegionalForecast { date } => format!("Regional forecast - {date}"),
            Selection::Surveillance { week, metric } => format!("SurSaUD - {metric} - {week}"),
            Selection::Doses(scope) => {
                format!("IQVIA - {} - {}", scope.campaign, scope.age_group)
            }
            Selection::Demo => "Demonstration data".to_string(),
        }
    }
}

/// Values offered for each selection parameter, sorted ascending.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SelectionOptions {
    pub forecast_dates: Vec<NaiveDate>,
    pub regional_forecast_dates: Vec<NaiveDate>,
    pub weeks: Vec<String>,
    pub metrics: Vec<String>,
    pub campaigns: Vec<String>,
    pub age_groups: Vec<String>,
}

impl SelectionOptions {
    pub fn from_datasets(datasets: &Datasets) -> Self {
        let mut options = SelectionOptions::default();

        if let Some(points) = &datasets.forecast {
            let dates: BTreeSet<NaiveDate> = points.iter().map(|p| p.date).collect();
            options.forecast_dates = dates.into_iter().collect();
        }
        if let Some(rows) = &datasets.regional_forecast {
            let dates: BTreeSet<NaiveDate> = rows.iter().map(|r| r.date).collect();
            options.regional_forecast_dates = dates.into_iter().collect();
        }
        if let Some(table) = &datasets.surveillance {
            let weeks: BTreeSet<&str> = table.records.iter().map(|r| r.week.as_str()).collect();
            options.weeks = weeks.into_iter().map(String::from).collect();
            options.metrics = table.metric_names.clone();
        }
        if let Some(doses) = &datasets.doses {
            let campaigns: BTreeSet<&str> = doses.iter().map(|d| d.campaign.as_str()).collect();
            let ages: BTreeSet<&str> = doses.iter().map(|d| d.age_group.as_str()).collect();
            options.campaigns = campaigns.into_iter().map(String::from).collect();
            options.age_groups = ages.into_iter().map(String::from).collect();
        }

        options
    }

    pub fn latest_forecast_date(&self) -> Option<NaiveDate> {
        self.forecast_dates.last().copied()
    }

    pub fn earliest_regional_forecast_date(&self) -> Option<NaiveDate> {
        self.regional_forecast_dates.first().copied()
    }

    pub fn latest_week(&self) -> Option<&str> {
        self.weeks.last().map(String::as_str)
    }

    pub fn latest_campaign(&self) -> Option<&str> {
        self.campaigns.last().map(String::as_str)
    }
}

/// A selection resolved against the datasets, before join keys are attached.
struct Resolved {
    table: CanonicalRegionTable,
    bounds: Vec<RegionBounds>,
    series: Vec<SeriesPoint>,
}

impl Resolved {
    fn table(table: CanonicalRegionTable) -> Self {
        Self {
            table,
            bounds: Vec::new(),
            series: Vec::new(),
        }
    }
}

fn resolve(
    selection: &Selection,
    datasets: &Datasets,
    weights: &RegionWeights,
    normalizer: &RegionNormalizer,
) -> Result<Resolved> {
    match selection {
        Selection::Forecast { date } => {
            let points = datasets
                .forecast
                .as_deref()
                .ok_or(PipelineError::SourceUnavailable("forecast"))?;
            let point = forecast_for_date(points, *date)?;
            let (table, bounds) = if point.lower.is_finite() && point.upper.is_finite() {
                let regional = apportion_forecast(point, weights)?;
                let bounds = regional.bounds();
                (regional.estimate, bounds)
            } else {
                warn!(%date, "Forecast interval missing, mapping the estimate only");
                (apportion(point.estimate, weights)?, Vec::new())
            };
            Ok(Resolved {
                table,
                bounds,
                series: forecast_series(points),
            })
        }
        Selection::RegionalForecast { date } => {
            let rows = datasets
                .regional_forecast
                .as_deref()
                .ok_or(PipelineError::SourceUnavailable("regional forecast"))?;
            regional_forecast_for_date(rows, *date, normalizer).map(Resolved::table)
        }
        Selection::Surveillance { week, metric } => {
            let table = datasets
                .surveillance
                .as_ref()
                .ok_or(PipelineError::SourceUnavailable("SurSaUD"))?;
            surveillance_by_region(table, week, metric, normalizer).map(Resolved::table)
        }
        Selection::Doses(scope) => {
            let records = datasets
                .doses
                .as_deref()
                .ok_or(PipelineError::SourceUnavailable("IQVIA"))?;
            let total = national_dose_total(records, scope)?;
            let series = daily_dose_totals(records, scope)?
                .into_iter()
                .map(|(date, value)| SeriesPoint::new(date, value))
                .collect();
            Ok(Resolved {
                table: apportion(total, weights)?,
                bounds: Vec::new(),
                series,
            })
        }
        Selection::Demo => demo_table().map(Resolved::table),
    }
}

fn forecast_series(points: &[ForecastPoint]) -> Vec<SeriesPoint> {
    let finite = |v: f64| Some(v).filter(|v| v.is_finite());
    let mut series: Vec<SeriesPoint> = points
        .iter()
        .map(|p| SeriesPoint {
            date: p.date,
            value: p.estimate,
            lower: finite(p.lower),
            upper: finite(p.upper),
            trend: p.trend,
        })
        .collect();
    series.sort_by_key(|p| p.date);
    series
}

/// Builds the canonical table for `selection`.
pub fn region_table(
    selection: &Selection,
    datasets: &Datasets,
    weights: &RegionWeights,
    normalizer: &RegionNormalizer,
) -> Result<CanonicalRegionTable> {
    resolve(selection, datasets, weights, normalizer).map(|r| r.table)
}

/// Runs the whole pipeline for one selection: table, join keys, summary,
/// top regions, bar order, forecast bounds and the national series.
#[tracing::instrument(skip(datasets, weights, normalizer))]
pub fn build_view(
    selection: &Selection,
    datasets: &Datasets,
    weights: &RegionWeights,
    normalizer: &RegionNormalizer,
) -> Result<RegionalView> {
    let Resolved {
        table,
        bounds,
        series,
    } = resolve(selection, datasets, weights, normalizer)?;
    let summary = summarize(&table)?;
    let rows = normalizer.attach_join_keys(&table)?;

    info!(regions = rows.len(), total = summary.total, "Regional view built");

    Ok(RegionalView {
        title: selection.title(),
        rows,
        summary,
        top: top_n(&table, TOP_REGIONS),
        bar_order: sorted_ascending(&table),
        bounds,
        series,
    })
}

impl RegionalView {
    /// Rank and share of `region` among the view's rows.
    ///
    /// `region` is normalized first, so a source label or an alias finds the
    /// same row as the geometry label.
    pub fn rank_of(&self, region: &str, normalizer: &RegionNormalizer) -> Result<RankShare> {
        let table = CanonicalRegionTable::new(
            self.rows
                .iter()
                .map(|r| RegionValue::new(r.region_mapped.clone(), r.value))
                .collect(),
        )?;
        rank_and_share(&table, normalizer.normalize(region))
    }
}

pub fn demo_table() -> Result<CanonicalRegionTable> {
    CanonicalRegionTable::new(
        DEMO_VALUES
            .iter()
            .map(|(region, value)| RegionValue::new(*region, *value))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::{
        ALL_AGES, DOSE_VARIABLE, DoseRecord, RegionalForecastRow, SurveillanceRecord,
        SurveillanceTable,
    };
    use std::collections::HashMap;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, d).unwrap()
    }

    fn datasets() -> Datasets {
        let surveillance = SurveillanceTable {
            metric_names: vec!["taux_urgences_grippe".into()],
            records: ["2025-W10", "2025-W11"]
                .iter()
                .map(|week| SurveillanceRecord {
                    region: "Bretagne".into(),
                    age_cohort: ALL_AGES.into(),
                    week: (*week).into(),
                    metrics: HashMap::from([("taux_urgences_grippe".to_string(), 12.0)]),
                })
                .collect(),
        };
        let doses = vec![DoseRecord {
            campaign: "2024-2025".into(),
            age_group: "65 ans et plus".into(),
            date: day(5),
            variable: DOSE_VARIABLE.into(),
            value: 50_000.0,
        }];
        let forecast = vec![
            ForecastPoint {
                date: day(12),
                estimate: 200.0,
                lower: 150.0,
                upper: 250.0,
                trend: Some(180.0),
            },
            ForecastPoint {
                date: day(5),
                estimate: 100.0,
                lower: 80.0,
                upper: 120.0,
                trend: None,
            },
        ];
        let regional_forecast = vec![
            RegionalForecastRow {
                date: day(5),
                region: "Bretagne".into(),
                estimate: 4_500.0,
            },
            RegionalForecastRow {
                date: day(5),
                region: "Corse".into(),
                estimate: 900.0,
            },
        ];
        Datasets {
            surveillance: Some(surveillance),
            doses: Some(doses),
            forecast: Some(forecast),
            regional_forecast: Some(regional_forecast),
        }
    }

    fn paca_alias() -> RegionNormalizer {
        RegionNormalizer::with_aliases(HashMap::from([(
            "PACA".to_string(),
            "Provence-Alpes-Côte d'Azur".to_string(),
        )]))
        .unwrap()
    }

    fn build(selection: &Selection, data: &Datasets) -> Result<RegionalView> {
        build_view(
            selection,
            data,
            &RegionWeights::default(),
            &RegionNormalizer::identity(),
        )
    }

    #[test]
    fn test_options_are_sorted_and_distinct() {
        let options = SelectionOptions::from_datasets(&datasets());
        assert_eq!(options.forecast_dates, vec![day(5), day(12)]);
        assert_eq!(options.latest_forecast_date(), Some(day(12)));
        assert_eq!(options.earliest_regional_forecast_date(), Some(day(5)));
        assert_eq!(options.latest_week(), Some("2025-W11"));
        assert_eq!(options.latest_campaign(), Some("2024-2025"));
        assert_eq!(options.age_groups, vec!["65 ans et plus"]);
    }

    #[test]
    fn test_options_for_empty_datasets() {
        let options = SelectionOptions::from_datasets(&Datasets::default());
        assert_eq!(options, SelectionOptions::default());
        assert_eq!(options.latest_week(), None);
    }

    #[test]
    fn test_forecast_view() {
        let view = build(&Selection::Forecast { date: day(5) }, &datasets()).unwrap();
        assert_eq!(view.rows.len(), 13);
        assert!((view.summary.total - 100.0).abs() < 1e-9);
        assert_eq!(view.top.len(), TOP_REGIONS);
        assert_eq!(view.top[0].region, "Île-de-France");
        assert_eq!(view.title, "Prophet forecast - 2026-01-05");
    }

    #[test]
    fn test_forecast_view_carries_bounds_and_series() {
        let view = build(&Selection::Forecast { date: day(5) }, &datasets()).unwrap();

        assert_eq!(view.bounds.len(), 13);
        let total_lower: f64 = view.bounds.iter().map(|b| b.lower).sum();
        let total_upper: f64 = view.bounds.iter().map(|b| b.upper).sum();
        assert!((total_lower - 80.0).abs() < 1e-9);
        assert!((total_upper - 120.0).abs() < 1e-9);
        assert!(view.bounds.iter().all(|b| b.lower <= b.upper));

        let dates: Vec<_> = view.series.iter().map(|p| p.date).collect();
        assert_eq!(dates, vec![day(5), day(12)]);
        assert_eq!(view.series[1].trend, Some(180.0));
        assert_eq!(view.series[1].lower, Some(150.0));
    }

    #[test]
    fn test_forecast_without_interval_maps_estimate() {
        let mut data = datasets();
        if let Some(points) = data.forecast.as_mut() {
            points[1].lower = f64::NAN;
        }
        let view = build(&Selection::Forecast { date: day(5) }, &data).unwrap();
        assert!(view.bounds.is_empty());
        assert!((view.summary.total - 100.0).abs() < 1e-9);
        assert_eq!(view.series[0].lower, None);
    }

    #[test]
    fn test_bar_order_is_ascending() {
        let view = build(&Selection::Demo, &Datasets::default()).unwrap();
        assert_eq!(view.bar_order.len(), 13);
        assert_eq!(view.bar_order[0].region, "Corse");
        assert_eq!(view.bar_order[12].region, "Île-de-France");
        assert!(view.bar_order.windows(2).all(|w| w[0].value <= w[1].value));
    }

    #[test]
    fn test_regional_forecast_view() {
        let selection = Selection::RegionalForecast { date: day(5) };
        let view = build(&selection, &datasets()).unwrap();

        assert_eq!(view.title, "Regional forecast - 2026-01-05");
        assert_eq!(view.rows.len(), 2);
        assert_eq!(view.top[0].region, "Bretagne");
        assert_eq!(view.summary.total, 5_400.0);
        assert!(view.bounds.is_empty());
        assert!(view.series.is_empty());
    }

    #[test]
    fn test_regional_forecast_requires_its_dataset() {
        let mut data = datasets();
        data.regional_forecast = None;
        let err = build(&Selection::RegionalForecast { date: day(5) }, &data).unwrap_err();
        assert_eq!(err, PipelineError::SourceUnavailable("regional forecast"));
    }

    #[test]
    fn test_dose_view_sums_to_national_total() {
        let scope = DoseScope {
            campaign: "2024-2025".into(),
            age_group: "65 ans et plus".into(),
            variable: DOSE_VARIABLE.into(),
        };
        let view = build(&Selection::Doses(scope), &datasets()).unwrap();
        let total: f64 = view.rows.iter().map(|r| r.value).sum();
        assert!((total - 50_000.0).abs() < 1e-6);
        assert_eq!(view.series.len(), 1);
        assert_eq!(view.series[0].value, 50_000.0);
        assert!(view.bounds.is_empty());
    }

    #[test]
    fn test_surveillance_view() {
        let selection = Selection::Surveillance {
            week: "2025-W10".into(),
            metric: "taux_urgences_grippe".into(),
        };
        let view = build(&selection, &datasets()).unwrap();
        assert_eq!(view.rows.len(), 1);
        assert_eq!(view.rows[0].region_mapped, "Bretagne");
        assert_eq!(view.summary.max, 12.0);
    }

    #[test]
    fn test_surveillance_view_pools_aliased_labels() {
        let surveillance = SurveillanceTable {
            metric_names: vec!["taux_urgences_grippe".into()],
            records: [("PACA", 10.0), ("Provence-Alpes-Côte d'Azur", 20.0)]
                .iter()
                .map(|(region, rate)| SurveillanceRecord {
                    region: (*region).into(),
                    age_cohort: ALL_AGES.into(),
                    week: "2025-W10".into(),
                    metrics: HashMap::from([("taux_urgences_grippe".to_string(), *rate)]),
                })
                .collect(),
        };
        let data = Datasets {
            surveillance: Some(surveillance),
            ..Datasets::default()
        };
        let selection = Selection::Surveillance {
            week: "2025-W10".into(),
            metric: "taux_urgences_grippe".into(),
        };

        let view =
            build_view(&selection, &data, &RegionWeights::default(), &paca_alias()).unwrap();
        assert_eq!(view.rows.len(), 1);
        assert_eq!(view.rows[0].region_mapped, "Provence-Alpes-Côte d'Azur");
        assert_eq!(view.rows[0].value, 15.0);
    }

    #[test]
    fn test_rank_of_normalizes_region_argument() {
        let view = build_view(
            &Selection::Demo,
            &Datasets::default(),
            &RegionWeights::default(),
            &paca_alias(),
        )
        .unwrap();

        let by_alias = view.rank_of("PACA", &paca_alias()).unwrap();
        let by_name = view
            .rank_of("Provence-Alpes-Côte d'Azur", &paca_alias())
            .unwrap();
        assert_eq!(by_alias, by_name);
        assert_eq!(by_alias.rank, 6);
        assert_eq!(
            view.rank_of("Guadeloupe", &paca_alias()).unwrap_err(),
            PipelineError::RegionNotFound("Guadeloupe".into())
        );
    }

    #[test]
    fn test_missing_dataset_is_not_replaced_by_demo() {
        let err = build(&Selection::Forecast { date: day(5) }, &Datasets::default()).unwrap_err();
        assert_eq!(err, PipelineError::SourceUnavailable("forecast"));
    }

    #[test]
    fn test_demo_view() {
        let view = build(&Selection::Demo, &Datasets::default()).unwrap();
        assert_eq!(view.rows.len(), 13);
        assert_eq!(view.summary.max, 85_000.0);
        assert_eq!(view.summary.min, 8_000.0);
    }
}
