//! Climatological aggregation: samples the same calendar day across every year
//! in the range and turns the samples into monthly probability summaries.

use std::ops::RangeInclusive;

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{
    jitter::Jitter,
    model::{
        Averages, Details, MonthlySummary, Probabilities, ProbabilityRequest, ProbabilityResponse,
    },
    series::{ClimateSeries, Variable},
};

pub const HEATWAVE_C: f64 = 35.0;
pub const HEAVY_RAIN_MM: f64 = 20.0;
pub const HIGH_WIND_MPS: f64 = 13.8;
pub const FREEZING_C: f64 = 0.0;

/// Number of monthly summaries produced per request.
pub const FORECAST_MONTHS: u32 = 10;

const HISTORICAL_CONFIDENCE: f64 = 0.95;
const PREDICTED_CONFIDENCE: f64 = 0.75;
const CONFIDENCE_DECAY_PER_MONTH: f64 = 0.03;
const CONFIDENCE_FLOOR: f64 = 0.50;

/// Inclusive range of years sampled for every calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
    pub start: i32,
    pub end: i32,
}

impl Default for YearRange {
    fn default() -> Self {
        Self { start: 1985, end: 2024 }
    }
}

impl YearRange {
    pub fn years(&self) -> RangeInclusive<i32> {
        self.start..=self.end
    }

    /// Number of years in the range; zero when the range is inverted.
    pub fn span(&self) -> u32 {
        u32::try_from(self.end - self.start + 1).unwrap_or(0)
    }
}

/// Running tallies for one calendar day across all sampled years.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct DayStats {
    valid_years: u32,
    heatwave_days: u32,
    heavy_rain_days: u32,
    high_wind_days: u32,
    snow_days: u32,
    temp_sum: f64,
    rain_sum: f64,
    wind_sum: f64,
    humidity_sum: f64,
    solar_sum: f64,
}

impl DayStats {
    fn collect<S>(series: &S, years: YearRange, month: u32, day: u32) -> Self
    where
        S: ClimateSeries + ?Sized,
    {
        let mut stats = Self::default();

        for year in years.years() {
            let get = |v: Variable| series.lookup(v, year, month, day);

            let temp = get(Variable::MaxTemperature);
            let temp_min = get(Variable::MinTemperature);
            let rain = get(Variable::Precipitation);
            let wind = get(Variable::MaxWindSpeed);

            // Heat and snow are only judged in years with a usable max temperature.
            if let Some(temp) = temp {
                stats.valid_years += 1;
                stats.temp_sum += temp;
                if temp > HEATWAVE_C {
                    stats.heatwave_days += 1;
                }
                let freezing = temp_min.is_some_and(|t| t < FREEZING_C);
                let wet = rain.is_some_and(|r| r > 0.0);
                if freezing && wet {
                    stats.snow_days += 1;
                }
            }
            if let Some(rain) = rain {
                stats.rain_sum += rain;
                if rain > HEAVY_RAIN_MM {
                    stats.heavy_rain_days += 1;
                }
            }
            if let Some(wind) = wind {
                stats.wind_sum += wind;
                if wind > HIGH_WIND_MPS {
                    stats.high_wind_days += 1;
                }
            }
            if let Some(humidity) = get(Variable::RelativeHumidity) {
                stats.humidity_sum += humidity;
            }
            if let Some(solar) = get(Variable::SolarIrradiance) {
                stats.solar_sum += solar;
            }
        }

        stats
    }
}

/// Turns a daily series into monthly summaries.
#[derive(Debug, Clone, Copy, Default)]
pub struct Aggregator {
    years: YearRange,
}

impl Aggregator {
    pub fn new(years: YearRange) -> Self {
        Self { years }
    }

    pub fn years(&self) -> YearRange {
        self.years
    }

    /// Build the full response for a validated request.
    pub fn respond<S>(
        &self,
        request: &ProbabilityRequest,
        series: &S,
        today: NaiveDate,
        jitter: &mut dyn Jitter,
    ) -> ProbabilityResponse
    where
        S: ClimateSeries + ?Sized,
    {
        let monthly_forecasts = self.monthly_summaries(series, request.start_date, today, jitter);

        ProbabilityResponse {
            location: request.location,
            start_date: request.raw_date.clone(),
            is_future_prediction: is_future(request.start_date, today),
            monthly_forecasts,
        }
    }

    /// Exactly [`FORECAST_MONTHS`] summaries, starting at `start`.
    ///
    /// `today` decides once whether the whole request is a prediction; only then is
    /// `jitter` sampled, once per month.
    pub fn monthly_summaries<S>(
        &self,
        series: &S,
        start: NaiveDate,
        today: NaiveDate,
        jitter: &mut dyn Jitter,
    ) -> Vec<MonthlySummary>
    where
        S: ClimateSeries + ?Sized,
    {
        let future = is_future(start, today);

        (0..FORECAST_MONTHS)
            .map(|offset| {
                let target = add_months(start, offset).unwrap_or(start);
                let stats = DayStats::collect(series, self.years, target.month(), target.day());
                let perturbation = if future { jitter.sample() } else { 0.0 };

                self.summarize(offset, target, future, perturbation, &stats)
            })
            .collect()
    }

    fn summarize(
        &self,
        offset: u32,
        target: NaiveDate,
        future: bool,
        perturbation: f64,
        stats: &DayStats,
    ) -> MonthlySummary {
        let years_to_use =
            if stats.valid_years > 0 { stats.valid_years } else { self.years.span().max(1) };
        let years = f64::from(years_to_use);

        let probability = |count: u32| {
            let raw = round_half_up(f64::from(count) / years * 100.0 + perturbation);
            raw.clamp(0.0, 100.0) as u8
        };
        let percent = |count: u32| round_half_up(f64::from(count) / years * 100.0) as i64;
        let mean = |sum: f64| round1(sum / years);

        MonthlySummary {
            month: (offset + 1) as u8,
            date: target,
            month_name: target.format("%B %Y").to_string(),
            is_future_prediction: future,
            confidence: confidence(future, offset),
            probabilities: Probabilities {
                heat: probability(stats.heatwave_days),
                rain: probability(stats.heavy_rain_days),
                wind: probability(stats.high_wind_days),
                snow: probability(stats.snow_days),
            },
            averages: Averages {
                temperature: mean(stats.temp_sum),
                rainfall: mean(stats.rain_sum),
                wind_speed: mean(stats.wind_sum),
                humidity: mean(stats.humidity_sum),
                solar_radiation: mean(stats.solar_sum),
                cloud_cover: round1(100.0 - stats.solar_sum / years / 3.0),
            },
            details: Details {
                heat: format!(
                    "{}% chance of extreme heat (>{HEATWAVE_C}°C)",
                    percent(stats.heatwave_days)
                ),
                rain: format!(
                    "{}% chance of heavy rainfall (>{HEAVY_RAIN_MM}mm)",
                    percent(stats.heavy_rain_days)
                ),
                wind: format!(
                    "{}% chance of strong winds (>{HIGH_WIND_MPS}m/s)",
                    percent(stats.high_wind_days)
                ),
                snow: format!("{}% chance of snow conditions", percent(stats.snow_days)),
            },
        }
    }
}

pub fn is_future(start: NaiveDate, today: NaiveDate) -> bool {
    start > today
}

/// Confidence percentage for a month offset; decays only for predictions.
pub fn confidence(future: bool, offset: u32) -> u8 {
    let (base, decay) = if future {
        (PREDICTED_CONFIDENCE, f64::from(offset) * CONFIDENCE_DECAY_PER_MONTH)
    } else {
        (HISTORICAL_CONFIDENCE, 0.0)
    };

    round_half_up((base - decay).max(CONFIDENCE_FLOOR) * 100.0) as u8
}

/// Adds calendar months keeping the day-of-month; days past the end of the
/// target month spill into the next one (Jan 31 + 1 month = Mar 3 in 2021).
pub fn add_months(date: NaiveDate, months: u32) -> Option<NaiveDate> {
    let total = date.year() * 12 + date.month0() as i32 + months as i32;
    let first = NaiveDate::from_ymd_opt(total.div_euclid(12), total.rem_euclid(12) as u32 + 1, 1)?;

    first.checked_add_days(Days::new(u64::from(date.day() - 1)))
}

/// Rounds halves toward positive infinity, so -2.5 becomes -2.
pub fn round_half_up(x: f64) -> f64 {
    (x + 0.5).floor()
}

fn round1(x: f64) -> f64 {
    round_half_up(x * 10.0) / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        jitter::{FixedJitter, NoJitter},
        model::{Location, ProbabilityQuery},
        series::DailySeries,
    };

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn fill<F>(series: &mut DailySeries, variable: Variable, month: u32, day: u32, value: F)
    where
        F: Fn(i32) -> f64,
    {
        for year in YearRange::default().years() {
            series.insert(variable, year, month, day, value(year));
        }
    }

    /// June 15: 10 hot years, 8 heavy-rain years, 4 windy years, no frost.
    fn june_fixture() -> DailySeries {
        let mut s = DailySeries::new();
        fill(&mut s, Variable::MaxTemperature, 6, 15, |y| if y < 1995 { 36.0 } else { 30.0 });
        fill(&mut s, Variable::MinTemperature, 6, 15, |_| 20.0);
        fill(&mut s, Variable::Precipitation, 6, 15, |y| if y < 1993 { 25.0 } else { 0.0 });
        fill(&mut s, Variable::MaxWindSpeed, 6, 15, |y| if y < 1989 { 15.0 } else { 5.0 });
        fill(&mut s, Variable::RelativeHumidity, 6, 15, |_| 60.0);
        fill(&mut s, Variable::SolarIrradiance, 6, 15, |_| 24.0);
        s
    }

    struct CountingJitter {
        calls: usize,
    }

    impl Jitter for CountingJitter {
        fn sample(&mut self) -> f64 {
            self.calls += 1;
            0.0
        }
    }

    #[test]
    fn historical_summary_has_exact_values() {
        let series = june_fixture();
        let out = Aggregator::default().monthly_summaries(
            &series,
            date(2020, 6, 15),
            date(2025, 1, 1),
            &mut NoJitter,
        );

        let june = &out[0];
        assert_eq!(june.month, 1);
        assert_eq!(june.date, date(2020, 6, 15));
        assert_eq!(june.month_name, "June 2020");
        assert!(!june.is_future_prediction);
        assert_eq!(june.confidence, 95);
        assert_eq!(june.probabilities, Probabilities { heat: 25, rain: 20, wind: 10, snow: 0 });
        assert_eq!(
            june.averages,
            Averages {
                temperature: 31.5,
                rainfall: 5.0,
                wind_speed: 6.0,
                humidity: 60.0,
                solar_radiation: 24.0,
                cloud_cover: 92.0,
            }
        );
        assert_eq!(june.details.heat, "25% chance of extreme heat (>35°C)");
        assert_eq!(june.details.rain, "20% chance of heavy rainfall (>20mm)");
        assert_eq!(june.details.wind, "10% chance of strong winds (>13.8m/s)");
        assert_eq!(june.details.snow, "0% chance of snow conditions");
    }

    #[test]
    fn historical_path_is_deterministic() {
        let series = june_fixture();
        let agg = Aggregator::default();
        let run = || agg.monthly_summaries(&series, date(2020, 6, 15), date(2025, 1, 1), &mut NoJitter);

        assert_eq!(run(), run());
    }

    #[test]
    fn produces_ten_ordered_months() {
        let out = Aggregator::default().monthly_summaries(
            &DailySeries::new(),
            date(2020, 6, 15),
            date(2025, 1, 1),
            &mut NoJitter,
        );

        assert_eq!(out.len(), 10);
        let months: Vec<u8> = out.iter().map(|m| m.month).collect();
        assert_eq!(months, (1..=10).collect::<Vec<u8>>());
        assert_eq!(out[9].date, date(2021, 3, 15));
        assert_eq!(out[6].month_name, "December 2020");
    }

    #[test]
    fn snow_needs_frost_and_precipitation_on_same_day() {
        let mut s = DailySeries::new();
        fill(&mut s, Variable::MaxTemperature, 12, 15, |_| 2.0);
        fill(&mut s, Variable::MinTemperature, 12, 15, |y| if y < 2005 { -3.0 } else { 1.0 });
        fill(&mut s, Variable::Precipitation, 12, 15, |y| if y % 2 == 0 { 1.0 } else { 0.0 });
        fill(&mut s, Variable::MaxWindSpeed, 12, 15, |_| 3.0);

        let out = Aggregator::default().monthly_summaries(
            &s,
            date(2020, 6, 15),
            date(2025, 1, 1),
            &mut NoJitter,
        );

        // Frost in 1985..=2004, wet in even years: 10 snow days.
        let december = &out[6];
        assert_eq!(december.date, date(2020, 12, 15));
        assert_eq!(december.probabilities.snow, 25);
        assert_eq!(december.details.snow, "25% chance of snow conditions");
    }

    #[test]
    fn all_missing_day_falls_back_to_full_span() {
        let mut s = DailySeries::new();
        fill(&mut s, Variable::MaxTemperature, 6, 15, |_| -999.0);
        fill(&mut s, Variable::Precipitation, 6, 15, |_| 40.0);
        fill(&mut s, Variable::SolarIrradiance, 6, 15, |_| -999.0);

        let out = Aggregator::default().monthly_summaries(
            &s,
            date(2020, 6, 15),
            date(2025, 1, 1),
            &mut NoJitter,
        );

        let june = &out[0];
        assert_eq!(june.probabilities.heat, 0);
        assert_eq!(june.averages.temperature, 0.0);
        assert_eq!(june.averages.solar_radiation, 0.0);
        assert_eq!(june.averages.cloud_cover, 100.0);
        // Rain is still counted, divided by the 40-year fallback.
        assert_eq!(june.probabilities.rain, 100);
        assert_eq!(june.averages.rainfall, 40.0);
    }

    #[test]
    fn variables_are_averaged_over_their_own_years() {
        let mut s = DailySeries::new();
        for year in 1985..2005 {
            s.insert(Variable::MaxTemperature, year, 6, 15, 30.0);
        }
        fill(&mut s, Variable::Precipitation, 6, 15, |y| if y < 1995 { 30.0 } else { 0.0 });

        let out = Aggregator::default().monthly_summaries(
            &s,
            date(2020, 6, 15),
            date(2025, 1, 1),
            &mut NoJitter,
        );

        // 20 valid temperature years are the divisor for every channel.
        let june = &out[0];
        assert_eq!(june.probabilities.rain, 50);
        assert_eq!(june.averages.rainfall, 15.0);
        assert_eq!(june.averages.temperature, 30.0);
    }

    #[test]
    fn historical_confidence_never_decays() {
        let out = Aggregator::default().monthly_summaries(
            &DailySeries::new(),
            date(2000, 1, 1),
            date(2025, 1, 1),
            &mut NoJitter,
        );

        assert!(out.iter().all(|m| m.confidence == 95));
    }

    #[test]
    fn future_confidence_decays_to_floor() {
        let out = Aggregator::default().monthly_summaries(
            &DailySeries::new(),
            date(2030, 1, 1),
            date(2025, 1, 1),
            &mut NoJitter,
        );

        let confidences: Vec<u8> = out.iter().map(|m| m.confidence).collect();
        assert_eq!(confidences, vec![75, 72, 69, 66, 63, 60, 57, 54, 51, 50]);
        assert!(out.iter().all(|m| m.is_future_prediction));
    }

    #[test]
    fn perturbation_moves_probabilities_but_not_details() {
        let series = june_fixture();
        let out = Aggregator::default().monthly_summaries(
            &series,
            date(2030, 6, 15),
            date(2025, 1, 1),
            &mut FixedJitter(3.0),
        );

        let june = &out[0];
        assert_eq!(june.probabilities, Probabilities { heat: 28, rain: 23, wind: 13, snow: 3 });
        assert_eq!(june.details.heat, "25% chance of extreme heat (>35°C)");
    }

    #[test]
    fn perturbation_is_clamped() {
        let mut s = DailySeries::new();
        fill(&mut s, Variable::MaxTemperature, 6, 15, |_| 40.0);

        let agg = Aggregator::default();
        let high = agg.monthly_summaries(&s, date(2030, 6, 15), date(2025, 1, 1), &mut FixedJitter(4.9));
        let low = agg.monthly_summaries(&s, date(2030, 6, 15), date(2025, 1, 1), &mut FixedJitter(-5.0));

        assert_eq!(high[0].probabilities.heat, 100);
        assert_eq!(low[0].probabilities.rain, 0);
        assert_eq!(low[0].probabilities.heat, 95);
    }

    #[test]
    fn jitter_is_sampled_once_per_month_only_for_predictions() {
        let agg = Aggregator::default();
        let series = DailySeries::new();

        let mut jitter = CountingJitter { calls: 0 };
        agg.monthly_summaries(&series, date(2030, 1, 1), date(2025, 1, 1), &mut jitter);
        assert_eq!(jitter.calls, 10);

        let mut jitter = CountingJitter { calls: 0 };
        agg.monthly_summaries(&series, date(2020, 1, 1), date(2025, 1, 1), &mut jitter);
        assert_eq!(jitter.calls, 0);
    }

    #[test]
    fn start_date_equal_to_today_is_not_future() {
        assert!(!is_future(date(2025, 1, 1), date(2025, 1, 1)));
        assert!(is_future(date(2025, 1, 2), date(2025, 1, 1)));
    }

    #[test]
    fn add_months_rolls_over_short_months() {
        assert_eq!(add_months(date(2021, 1, 31), 1), Some(date(2021, 3, 3)));
        assert_eq!(add_months(date(2020, 1, 31), 1), Some(date(2020, 3, 2)));
        assert_eq!(add_months(date(2021, 1, 31), 3), Some(date(2021, 5, 1)));
        assert_eq!(add_months(date(2020, 11, 30), 3), Some(date(2021, 3, 2)));
        assert_eq!(add_months(date(2020, 6, 15), 9), Some(date(2021, 3, 15)));
    }

    #[test]
    fn rollover_dates_drive_the_sampled_day() {
        let mut s = DailySeries::new();
        fill(&mut s, Variable::MaxTemperature, 3, 3, |_| 36.0);

        let out = Aggregator::default().monthly_summaries(
            &s,
            date(2021, 1, 31),
            date(2025, 1, 1),
            &mut NoJitter,
        );

        assert_eq!(out[1].date, date(2021, 3, 3));
        assert_eq!(out[1].probabilities.heat, 100);
    }

    #[test]
    fn rounding_is_half_up() {
        assert_eq!(round_half_up(2.5), 3.0);
        assert_eq!(round_half_up(-2.5), -2.0);
        assert_eq!(round1(-0.25), -0.2);
        assert_eq!(round1(0.25), 0.3);
    }

    #[test]
    fn respond_echoes_request() {
        let request = ProbabilityQuery::new("9.84", "77.16", "2020-06-15").validate().unwrap();
        let mut s = DailySeries::new();
        fill(&mut s, Variable::MaxTemperature, 6, 15, |_| 36.0);

        let response = Aggregator::default().respond(&request, &s, date(2025, 1, 1), &mut NoJitter);

        assert_eq!(response.location, Location { lat: 9.84, lon: 77.16 });
        assert_eq!(response.start_date, "2020-06-15");
        assert!(!response.is_future_prediction);
        assert_eq!(response.monthly_forecasts[0].probabilities.heat, 100);
        assert_eq!(response.monthly_forecasts[0].confidence, 95);
    }

    #[test]
    fn year_range_span() {
        assert_eq!(YearRange::default().span(), 40);
        assert_eq!(YearRange { start: 2000, end: 1999 }.span(), 0);
    }
}
