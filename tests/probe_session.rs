//! Probe sessions end to end: service, prober, workers and a fake driver

mod common;

use common::builders::*;
use common::mock_helpers::{FakeDriverHandle, FakeFirmware, FakeProbeDriver};
use common::{contains_slice, test_timeout, wait_until};
use dsp_debug_agent::codec::{encode, ByteStreamWriter};
use dsp_debug_agent::config::ProbeSettings;
use dsp_debug_agent::firmware::{Packet, ProbePointId, ProbeType};
use dsp_debug_agent::handler::ModuleHandler;
use dsp_debug_agent::probe::driver::ChannelKind;
use dsp_debug_agent::probe::{
    ChannelId, ProbeConfig, ProbeId, ProbePurpose, ProbeService, ProbeState, ProbeWorkerEvent,
    Prober,
};

fn settings() -> ProbeSettings {
    ProbeSettings {
        queue_size_bytes: 4096,
        poll_interval_ms: 1,
    }
}

fn handler() -> ModuleHandler<FakeFirmware> {
    ModuleHandler::new(FakeFirmware::new(canonical_sample())).unwrap()
}

/// Reference output of the DMIC gain
fn extraction_point() -> ProbePointId {
    ProbePointId::new(GAIN as u32, 1, ProbeType::Output, 0).unwrap()
}

/// Input of the capture noise suppressor
fn injection_point() -> ProbePointId {
    ProbePointId::new(NS as u32, 2, ProbeType::Input, 0).unwrap()
}

fn configure<T: dsp_debug_agent::transport::Transport>(
    service: &ProbeService<'_, FakeProbeDriver, T>,
) {
    service
        .set_configuration(
            ProbeId(0),
            ProbeConfig::new(extraction_point(), ProbePurpose::Extract),
        )
        .unwrap();
    service
        .set_configuration(
            ProbeId(2),
            ProbeConfig::new(injection_point(), ProbePurpose::Inject),
        )
        .unwrap();
}

fn packet(data: &[u8]) -> Packet {
    Packet {
        probe_point_id: extraction_point(),
        format: 0,
        dsp_wall_clock_ts_hw: 0,
        dsp_wall_clock_ts_lw: 42,
        data: data.to_vec(),
    }
}

fn start_session(handler: &ModuleHandler<FakeFirmware>) -> (ProbeService<'_, FakeProbeDriver, FakeFirmware>, FakeDriverHandle) {
    let (driver, handle) = FakeProbeDriver::new(2, 2);
    let service = ProbeService::new(Prober::new(driver, &settings()), handler);
    configure(&service);
    service.set_state(true).unwrap();
    (service, handle)
}

#[test]
fn test_session_lifecycle() {
    let handler = handler();
    let (service, handle) = start_session(&handler);

    assert!(service.is_active().unwrap());
    assert_eq!(handle.state(), ProbeState::Active);
    {
        let log = handle.log.lock().unwrap();
        assert_eq!(
            log.transitions,
            vec![
                (ProbeState::Idle, ProbeState::Owned),
                (ProbeState::Owned, ProbeState::Allocated),
                (ProbeState::Allocated, ProbeState::Active),
            ]
        );
        // every channel is programmed, unused ones disabled
        assert_eq!(log.channel_writes.len(), 4);
        assert_eq!(log.channel_writes[0].0, ChannelKind::Extraction);
        assert_eq!(log.channel_writes[0].2.probe_point, extraction_point());
        assert!(!log.channel_writes[1].2.enabled);
        assert_eq!(log.channel_writes[2].1, ChannelId(0));
        assert_eq!(log.channel_writes[2].2.probe_point, injection_point());
    }

    service.set_state(false).unwrap();
    assert!(!service.is_active().unwrap());
    assert_eq!(handle.state(), ProbeState::Idle);
}

#[test]
fn test_extraction_reaches_consumer() {
    let handler = handler();
    let (service, handle) = start_session(&handler);

    // split across two chunks
    let bytes = encode(&packet(&[1, 2, 3, 4, 5, 6]));
    handle.stream.send(bytes[..7].to_vec()).unwrap();
    handle.stream.send(bytes[7..].to_vec()).unwrap();

    let mut expected = ByteStreamWriter::new();
    packet(&[1, 2, 3, 4, 5, 6]).write_compact(&mut expected);
    let block = service.prober().dequeue_extraction_block(ProbeId(0)).unwrap();
    assert_eq!(block, Some(expected.into_inner()));

    service.set_state(false).unwrap();
    assert_eq!(service.prober().dequeue_extraction_block(ProbeId(0)).unwrap(), None);
}

#[test]
fn test_injection_reaches_driver() {
    let handler = handler();
    let (service, handle) = start_session(&handler);

    // 16-bit mono: two bytes per sample
    let samples = [0x11, 0x22, 0x33, 0x44, 0x55, 0x66];
    assert!(service
        .prober()
        .enqueue_injection_block(ProbeId(2), &samples)
        .unwrap());

    assert!(wait_until(|| contains_slice(
        &handle.injected(ChannelId(0)),
        &samples
    )));
    service.set_state(false).unwrap();

    let injected = handle.injected(ChannelId(0));
    assert_eq!(injected.len() % 2, 0);
    // the prefill is silence
    assert_eq!(&injected[..8], &[0; 8]);
}

#[test]
fn test_failed_start_rolls_back() {
    let handler = handler();
    let (driver, handle) = FakeProbeDriver::new(2, 2);
    let service = ProbeService::new(
        Prober::new(driver.failing_on(ProbeState::Active), &settings()),
        &handler,
    );
    configure(&service);

    let err = service.set_state(true).unwrap_err();
    assert_eq!(err.to_string(), "Unable to set state to driver: cannot enter Active");
    assert_eq!(handle.state(), ProbeState::Idle);
    assert!(!service.is_active().unwrap());
}

#[test]
fn test_failed_allocation_rolls_back() {
    let handler = handler();
    let (driver, handle) = FakeProbeDriver::new(2, 2);
    let service = ProbeService::new(
        Prober::new(driver.failing_on(ProbeState::Allocated), &settings()),
        &handler,
    );
    configure(&service);

    let err = service.set_state(true).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Unable to set state to driver: cannot enter Allocated"
    );
    assert_eq!(handle.state(), ProbeState::Idle);
    assert_eq!(
        handle.log.lock().unwrap().transitions,
        vec![
            (ProbeState::Idle, ProbeState::Owned),
            (ProbeState::Owned, ProbeState::Idle),
        ]
    );
    assert!(!service.is_active().unwrap());
}

#[test]
fn test_stream_end_is_reported() {
    let handler = handler();
    let (service, handle) = start_session(&handler);
    let events = service.prober().worker_events();

    let FakeDriverHandle { log, stream } = handle;
    drop(stream);

    assert_eq!(
        events.recv_timeout(test_timeout()).unwrap(),
        ProbeWorkerEvent::ExtractionFinished
    );
    // the driver stays active until told otherwise
    assert_eq!(log.lock().unwrap().state, ProbeState::Active);
}

#[test]
fn test_probe_on_missing_pin() {
    let handler = handler();
    let (driver, handle) = FakeProbeDriver::new(2, 2);
    let service = ProbeService::new(Prober::new(driver, &settings()), &handler);

    let point = ProbePointId::new(NS as u32, 2, ProbeType::Input, 3).unwrap();
    service
        .set_configuration(ProbeId(2), ProbeConfig::new(point, ProbePurpose::Inject))
        .unwrap();

    let err = service.set_state(true).unwrap_err();
    assert_eq!(err.to_string(), "Invalid pin index: 3 max: 1");
    assert!(handle.log.lock().unwrap().transitions.is_empty());
}
