//! Unit tests for brent-analysis modules

#[cfg(test)]
mod tests {
    use brent_analysis::changepoint::{
        cusum_change_point, BayesianChangePoint, ChangePointDetector, CostModel, CusumDetector, Pelt,
    };
    use brent_analysis::config::{BayesianConfig, PeltConfig};
    use brent_analysis::data::{read_prices, Period};
    use brent_analysis::stats::{mean, rolling_std, BasicStatistics};

    const CSV: &str = "Date,Price\n\
        20-May-87,18.63\n\
        21-May-87,\n\
        22-May-87,18.55\n\
        \"Apr 22, 2020\",13.77\n\
        2020-04-21,9.12\n";

    fn step(n1: usize, n2: usize) -> Vec<f64> {
        (0..n1 + n2)
            .map(|i| {
                let level = if i < n1 { 20.0 } else { 60.0 };
                level + 0.05 * (i as f64 * 2.1).sin()
            })
            .collect()
    }

    #[test]
    fn test_loader_mixed_formats_and_gap() {
        let series = read_prices(CSV.as_bytes()).unwrap();
        assert_eq!(series.len(), 5);
        // interpolated between neighbours
        assert!((series.prices()[1] - 18.59).abs() < 1e-9);
        // ISO and long-form dates sorted chronologically
        let dates = series.dates();
        assert!(dates.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(series.last().price, 13.77);
    }

    #[test]
    fn test_yearly_resample() {
        let series = read_prices(CSV.as_bytes()).unwrap();
        let yearly = series.resample(Period::Year);
        assert_eq!(yearly.len(), 2);
        assert_eq!(series.annual()[0].0, 1987);
    }

    #[test]
    fn test_basic_statistics_and_volatility() {
        let prices = [1.0, 2.0, 3.0, 4.0, 10.0];
        let stats = BasicStatistics::compute(&prices).unwrap();
        assert_eq!(stats.mean, 4.0);
        assert_eq!(stats.median, 3.0);
        assert!((stats.std_dev - 12.5f64.sqrt()).abs() < 1e-12);

        let vol = rolling_std(&prices, 3).unwrap();
        assert_eq!(vol.len(), 5);
        assert!(vol[0].is_none() && vol[1].is_none());
        assert!((vol[2].unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_cusum_is_argmax_of_running_deviation() {
        let prices = step(30, 70);
        let m = mean(&prices).unwrap();
        let idx = cusum_change_point(&prices, m).unwrap();

        let mut running = 0.0;
        let deviations: Vec<f64> = prices
            .iter()
            .map(|p| {
                running += p - m;
                running.abs()
            })
            .collect();
        let expected = deviations
            .iter()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |best, (i, &d)| if d > best.1 { (i, d) } else { best })
            .0;
        assert_eq!(idx, expected);
        assert_eq!(idx, 29);
    }

    #[test]
    fn test_detectors_agree_on_clean_step() {
        let signal: Vec<f64> = (0..100).map(|i| if i < 60 { 20.0 } else { 60.0 }).collect();
        let detectors: Vec<Box<dyn ChangePointDetector>> = vec![
            Box::new(CusumDetector),
            Box::new(Pelt::new(CostModel::L2)),
            Box::new(PeltConfig::default().detector()),
        ];
        for detector in &detectors {
            let bkps = detector.detect(&signal).unwrap();
            assert_eq!(bkps.breakpoints(), &[60, 100], "{}", detector.name());
        }
    }

    #[test]
    fn test_bayesian_detector_on_noisy_step() {
        let signal: Vec<f64> = (0..100)
            .map(|i| {
                let level = if i < 60 { 2.0 } else { 7.0 };
                level + 0.1 * (i as f64 * 1.3).sin()
            })
            .collect();
        let detector: Box<dyn ChangePointDetector> = Box::new(BayesianChangePoint::new(BayesianConfig {
            n_samples: 500,
            n_warmup: 300,
            ..Default::default()
        }));
        assert_eq!(detector.name(), "Bayesian");
        assert_eq!(detector.detect(&signal).unwrap().breakpoints(), &[60, 100]);
    }
}
