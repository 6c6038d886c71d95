use ampir::core::{Error, ResultInfo};
use ampir::deformation::{DeformationSettings, DeformedSector};

use assert_approx_eq::assert_approx_eq;
use num_complex::Complex64;

/// A sector whose admissible deformation parameters are the constant band
/// `[0.5, 2.0]` and whose sign check passes iff the first parameter is at
/// most `threshold`.
fn banded_sector(sector_id: u32, orders: Vec<i32>, threshold: f64) -> DeformedSector {
    DeformedSector::new(
        sector_id,
        orders,
        2,
        |_x: &[f64], _dp: &[f64]| Complex64::new(1.0, 0.0),
        move |_x: &[f64], dp: &[f64]| {
            if dp.iter().all(|parameter| *parameter == 0.0) {
                // the undeformed contour
                Complex64::new(0.0, 0.0)
            } else if dp[0] <= threshold {
                Complex64::new(0.0, -1.0)
            } else {
                Complex64::new(0.0, 1.0)
            }
        },
        |admissible: &mut [f64], _x: &[f64]| {
            admissible[0] = 0.5;
            admissible[1] = 2.0;
        },
    )
    .unwrap()
}

#[test]
fn zero_presamples_keep_the_maximum_everywhere() {
    let sector = banded_sector(1, vec![0], 1.0);
    let settings = DeformationSettings {
        number_of_presamples: 0,
        ..DeformationSettings::default()
    };

    assert_eq!(
        sector.optimize_deformation_parameters(&settings).unwrap(),
        vec![1.0, 1.0]
    );
}

#[test]
fn presampling_takes_per_axis_minima_within_the_bounds() {
    // every sample admits [0.5, 2.0]; 2.0 exceeds the maximum so that axis
    // stays at the maximum
    let sector = banded_sector(2, vec![0], 1.0);
    let settings = DeformationSettings {
        number_of_presamples: 10,
        ..DeformationSettings::default()
    };

    let parameters = sector.optimize_deformation_parameters(&settings).unwrap();
    assert_approx_eq!(parameters[0], 0.5, 1e-15);
    assert_approx_eq!(parameters[1], 1.0, 1e-15);
}

#[test]
fn sign_check_shrinks_the_whole_vector() {
    // the check passes only once 0.5 * 0.9^k drops below 0.35, i.e. k = 4
    let sector = banded_sector(3, vec![-1, 0], 0.35);
    let settings = DeformationSettings {
        number_of_presamples: 10,
        ..DeformationSettings::default()
    };

    let parameters = sector.optimize_deformation_parameters(&settings).unwrap();
    let shrink = 0.9_f64.powi(4);
    assert_approx_eq!(parameters[0], 0.5 * shrink, 1e-12);
    assert_approx_eq!(parameters[1], 1.0 * shrink, 1e-12);
}

#[test]
fn unsatisfiable_sign_check_is_reported() {
    let sector = banded_sector(9, vec![2], -1.0);
    let settings = DeformationSettings {
        number_of_presamples: 1,
        ..DeformationSettings::default()
    };

    assert_eq!(
        sector.optimize_deformation_parameters(&settings).unwrap_err(),
        Error::SignCheck {
            sector_id: 9,
            orders: vec![2],
        }
    );
}

#[test]
fn deformed_container_reports_sign_violations() {
    let sector = banded_sector(5, vec![0], 0.35);
    let container = sector.into_integrand_container(vec![0.5, 1.0]).unwrap();

    let mut info = ResultInfo::default();
    let value = container.evaluate(&[0.25, 0.25], &mut info);

    assert_eq!(value, Complex64::new(0.0, 0.0));
    let message = info.sign_check_error.expect("expected a sign-check error");
    assert!(message.contains("sector 5"));
}

#[test]
fn deformed_container_evaluates_where_the_check_passes() {
    let sector = banded_sector(6, vec![0], 0.35);
    let container = sector.into_integrand_container(vec![0.3, 1.0]).unwrap();

    let mut info = ResultInfo::default();
    let value = container.evaluate(&[0.25, 0.25], &mut info);

    assert_eq!(value, Complex64::new(1.0, 0.0));
    assert!(info.sign_check_error.is_none());
}
