mod common;

use common::*;

use stm32_adc_groups::adc::config::InputMode;
use stm32_adc_groups::adc::{
    calibration_timeout_loops, Error, ErrorCode, Group, Notification, State,
    MAX_CALIBRATION_FACTOR,
};
use stm32_adc_groups::time::Hertz;

#[test]
fn calibration_leaves_adc_ready() {
    let chip = chip();
    let mut adc = adc(&chip, ADC1);

    assert_eq!(adc.calibrate(InputMode::SingleEnded), Ok(()));
    assert!(adc.state().contains(State::Ready));
    assert!(!adc.state().contains(State::Calibrating));
    assert_eq!(adc.calibration_factor(InputMode::SingleEnded), 0x42);
    assert_eq!(adc.calibration_factor(InputMode::Differential), 0);
}

#[test]
fn stuck_calibration_times_out() {
    let chip = chip();
    chip.borrow_mut().adcs[ADC1].stuck_calibration = true;
    let mut adc = adc_with(&chip, ADC1, slow_config());

    assert_eq!(adc.calibrate(InputMode::Differential), Err(Error::Timeout));
    assert!(adc.state().contains(State::ErrorInternal));
    assert!(!adc.state().contains(State::Calibrating));
    assert!(!adc.state().contains(State::Ready));
    assert!(adc
        .error_code()
        .is_superset(ErrorCode::Internal | ErrorCode::Timeout));
    assert_eq!(adc.last_error(), Some(Error::Internal));

    // Not retried behind the caller's back
    assert_eq!(adc.calibrate(InputMode::Differential), Err(Error::Timeout));
}

#[test]
fn calibration_bound_follows_system_clock() {
    assert_eq!(calibration_timeout_loops(Hertz(1_000)), 1_320);
    assert_eq!(calibration_timeout_loops(Hertz(64_000_000)), 84_480_000);
}

#[test]
fn calibration_refused_while_converting() {
    let chip = chip();
    let mut adc = adc(&chip, ADC1);
    adc.start(Group::Regular, Notification::Polling).unwrap();

    assert_eq!(adc.calibrate(InputMode::SingleEnded), Err(Error::Busy));
    assert!(chip.borrow().adcs[ADC1].converting.contains(Group::Regular));
    assert!(adc.state().contains(State::RegularBusy));
    assert!(!adc.state().contains(State::Calibrating));
}

#[test]
fn calibration_factor_round_trip() {
    let chip = chip();
    let mut adc = adc(&chip, ADC1);
    adc.enable().unwrap();

    for &mode in &[InputMode::SingleEnded, InputMode::Differential] {
        for factor in 0..=MAX_CALIBRATION_FACTOR {
            assert_eq!(adc.set_calibration_factor(mode, factor), Ok(()));
            assert_eq!(adc.calibration_factor(mode), factor);
        }
    }
    assert!(adc.error_code().is_empty());
}

#[test]
fn calibration_factor_out_of_range() {
    let chip = chip();
    let mut adc = adc(&chip, ADC1);
    adc.enable().unwrap();
    adc.set_calibration_factor(InputMode::SingleEnded, 0x10)
        .unwrap();

    assert_eq!(
        adc.set_calibration_factor(InputMode::SingleEnded, MAX_CALIBRATION_FACTOR + 1),
        Err(Error::Config)
    );
    assert_eq!(adc.calibration_factor(InputMode::SingleEnded), 0x10);
}

#[test]
fn calibration_factor_kept_while_converting() {
    let chip = chip();
    let mut adc = adc(&chip, ADC1);
    adc.enable().unwrap();
    adc.set_calibration_factor(InputMode::SingleEnded, 0x21)
        .unwrap();
    adc.start(Group::Injected, Notification::Polling).unwrap();

    assert_eq!(
        adc.set_calibration_factor(InputMode::SingleEnded, 0x22),
        Err(Error::Config)
    );
    assert_eq!(adc.calibration_factor(InputMode::SingleEnded), 0x21);
    assert!(adc.state().contains(State::ErrorConfig));
    assert!(adc.error_code().contains(ErrorCode::Config));
}

#[test]
fn calibration_factor_needs_enabled_adc() {
    let chip = chip();
    let mut adc = adc(&chip, ADC1);

    assert_eq!(
        adc.set_calibration_factor(InputMode::Differential, 1),
        Err(Error::Config)
    );
    assert_eq!(adc.calibration_factor(InputMode::Differential), 0);
}
