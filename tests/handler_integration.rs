//! Firmware queries through a fake transport

mod common;

use common::builders::*;
use common::mock_helpers::FakeFirmware;
use dsp_debug_agent::codec::FirmwareEnum;
use dsp_debug_agent::firmware::{BaseFwParam, ParameterId, MAX_PARAMETER_PAYLOAD_SIZE};
use dsp_debug_agent::handler::ModuleHandler;
use dsp_debug_agent::transport::Transport;
use dsp_debug_agent::AgentError;
use std::sync::Arc;

#[test]
fn test_limits_from_sample() {
    let handler = ModuleHandler::new(FakeFirmware::new(canonical_sample())).unwrap();
    let limits = handler.limits();

    assert_eq!(limits.fw_version.to_string(), "1.2.3.4");
    assert_eq!(limits.modules_count, 7);
    assert_eq!(limits.max_ppl_count, 10);
    assert_eq!(limits.max_mod_inst_count, 4);
    assert_eq!(limits.dsp_core_count, 1);
    assert_eq!(limits.gateway_count, 5);
}

#[test]
fn test_listings() {
    let handler = ModuleHandler::new(FakeFirmware::new(canonical_sample())).unwrap();

    let names: Vec<String> = handler
        .module_entries()
        .unwrap()
        .iter()
        .map(|entry| entry.name())
        .collect();
    assert_eq!(names, ["copier", "aec", "gain", "ns", "mixin", "src", "mixout"]);

    assert_eq!(handler.pipeline_ids().unwrap(), vec![4, 2, 1, 3]);
    assert_eq!(handler.pipeline_props(3).unwrap().ll_tasks, vec![4]);
    assert_eq!(handler.gateways().unwrap().len(), 5);

    let props = handler.module_instance_props(MIXIN, 1).unwrap();
    assert_eq!(props.input_pins.len(), 2);
    assert_eq!(props.input_pins[1].phys_queue_id, PIPE2_3);
    assert_eq!(props.input_pins[1].format, sample_format());
}

#[test]
fn test_pipeline_list_beyond_declared_maximum() {
    let mut sample = canonical_sample();
    sample.max_ppl_count = 2;
    let handler = ModuleHandler::new(FakeFirmware::new(sample)).unwrap();

    // the reply is cut at the size allocated for two pipelines
    let err = handler.pipeline_ids().unwrap_err();
    assert!(
        err.to_string().starts_with("Can not decode fw parameter"),
        "{}",
        err
    );
}

#[test]
fn test_module_parameter_round_trip() {
    let firmware = Arc::new(FakeFirmware::new(canonical_sample()));
    let handler = ModuleHandler::new(Arc::clone(&firmware)).unwrap();

    handler
        .set_module_parameter(GAIN, 5, ParameterId(3), &[1, 2, 3, 4, 5])
        .unwrap();
    assert_eq!(
        handler.get_module_parameter(GAIN, 5, ParameterId(3), 3).unwrap(),
        vec![1, 2, 3]
    );

    let stats = firmware.stats();
    assert_eq!(stats.configures, 1);
    assert!(stats.queries >= 3);
}

#[test]
fn test_oversized_parameter_is_rejected() {
    let handler = ModuleHandler::new(FakeFirmware::new(canonical_sample())).unwrap();
    let payload = vec![0; MAX_PARAMETER_PAYLOAD_SIZE + 1];

    let err = handler
        .set_module_parameter(GAIN, 5, ParameterId(3), &payload)
        .unwrap_err();
    assert!(matches!(err, AgentError::InvalidArgument(_)));
}

#[test]
fn test_transport_failure_carries_context() {
    let firmware = FakeFirmware::new(canonical_sample());
    firmware.fail(BaseFwParam::GatewaysInfoGet);
    let handler = ModuleHandler::new(firmware).unwrap();

    let err = handler.gateways().unwrap_err();
    assert_eq!(
        err.to_string(),
        format!(
            "Unable to query parameter {} of module 0 instance 0: injected failure on {}",
            ParameterId(BaseFwParam::GatewaysInfoGet.to_raw()),
            BaseFwParam::GatewaysInfoGet
        )
    );
}

#[test]
fn test_missing_configuration_fails_construction() {
    let firmware = FakeFirmware::new(canonical_sample());
    firmware.fail(BaseFwParam::HwConfigGet);

    let err = ModuleHandler::new(firmware).err().unwrap();
    assert!(err
        .to_string()
        .starts_with("Unable to read hardware configuration"));
}
