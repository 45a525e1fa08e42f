//! End-to-end bridge scenarios against a config-backed platform.

use std::collections::HashMap;
use std::path::Path;
use weld_bridge::{BridgeError, ConfigPlatform, PlatformProxy, SignalBridge};
use weld_common::{Direction, Role};
use weld_guest::{Expr, TOP_DOMAIN};
use weld_host::{HostModule, Special};

const CONFIG: &str = r#"
[bridge]
output_dir = "unused"
device = "LFE5U-25F"

[[resource]]
name = "led"
width = 1

[[resource]]
name = "user_led"
width = 4
inverted = true

[[resource]]
name = "btn"
width = 4
inverted = true

[[resource]]
name = "sdram_dq"
width = 8
"#;

fn platform(output_dir: &Path) -> ConfigPlatform {
    let mut config = weld_config::load_config_from_str(CONFIG).unwrap();
    config.bridge.output_dir = output_dir.to_path_buf();
    ConfigPlatform::new(config)
}

fn bridge(platform: &ConfigPlatform) -> SignalBridge {
    SignalBridge::new(platform.module_name(), HostModule::new("top"))
}

#[test]
fn led_output_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let mut platform = platform(dir.path());
    let mut bridge = bridge(&platform);

    let led = PlatformProxy::new(&mut bridge, &mut platform)
        .request("led", None, Some(Direction::Output.into()), Some(0u8.into()))
        .unwrap();
    let o = led.signal(Role::O).unwrap();
    assert_eq!(led.signature().len(), 1);
    assert_eq!(bridge.guest().signal(o).shape.width, 1);
    bridge.guest_mut().comb(o, Expr::konst(1, 1));
    let pad = bridge.source_of(o).unwrap();

    let path = bridge.finalize(&mut platform).unwrap();
    assert_eq!(path, dir.path().join("gateware").join("guest_wrapper.v"));
    assert_eq!(platform.sources().to_vec(), vec![path.clone()]);

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("module guest_wrapper(pad_led_o);"));
    assert!(text.contains("output pad_led_o;"));

    let instance = bridge.host().instances().next().unwrap();
    assert_eq!(instance.module, "guest_wrapper");
    let labels: Vec<_> = instance.ports.keys().map(String::as_str).collect();
    assert_eq!(labels, vec!["o_pad_led_o"]);
    assert_eq!(instance.port("o_pad_led_o"), Some(pad));
    assert!(bridge.host().assignments.is_empty());
}

#[test]
fn sdram_dq_bidirectional_single_rate() {
    let dir = tempfile::tempdir().unwrap();
    let mut platform = platform(dir.path());
    let mut bridge = bridge(&platform);
    bridge.declare_clock_domain("sys").unwrap();

    let mut proxy = PlatformProxy::new(&mut bridge, &mut platform);
    assert_eq!(proxy.device(), "LFE5U-25F");
    let dq = proxy
        .request("sdram_dq", None, Some(Direction::InOut.into()), Some(1u8.into()))
        .unwrap();
    let again = proxy
        .request("sdram_dq", None, Some(Direction::InOut.into()), Some(1u8.into()))
        .unwrap();
    assert_eq!(dq, again);

    let mut members: Vec<_> = dq.signature().members().map(|(n, _)| n).collect();
    members.sort_unstable();
    assert_eq!(members, vec!["i", "i_clk", "o", "o_clk", "oe"]);

    let specials = &bridge.host().specials;
    let tristates = specials
        .iter()
        .filter(|s| matches!(s, Special::Tristate { .. }))
        .count();
    let synchronizers = specials.iter().filter(|s| s.is_synchronizer()).count();
    assert_eq!((tristates, synchronizers), (1, 2));
    // 2 for the clock domain, 5 for the pad.
    assert_eq!(bridge.connections().len(), 7);

    // Loop the pad back through the guest on the system clock.
    let guest_clk = bridge.guest().domain(TOP_DOMAIN).unwrap().clk;
    let g = |role| dq.signal(role).unwrap();
    bridge.guest_mut().comb(g(Role::O), g(Role::I));
    bridge.guest_mut().comb(g(Role::Oe), Expr::konst(1, 1));
    bridge.guest_mut().comb(g(Role::IClk), guest_clk);
    bridge.guest_mut().comb(g(Role::OClk), guest_clk);
    bridge.finalize(&mut platform).unwrap();

    let instance = bridge.host().instances().next().unwrap();
    let labels: Vec<_> = instance.ports.keys().map(String::as_str).collect();
    assert_eq!(
        labels,
        vec![
            "i_clk",
            "i_pad_sdram_dq_i",
            "i_rst",
            "o_pad_sdram_dq_i_clk",
            "o_pad_sdram_dq_o",
            "o_pad_sdram_dq_o_clk",
            "o_pad_sdram_dq_oe",
        ]
    );
}

#[test]
fn single_rate_output_is_registered_on_its_clock() {
    let dir = tempfile::tempdir().unwrap();
    let mut platform = platform(dir.path());
    let mut bridge = bridge(&platform);
    let led = PlatformProxy::new(&mut bridge, &mut platform)
        .request("led", None, Some(Direction::Output.into()), Some(1u8.into()))
        .unwrap();
    let o = bridge.source_of(led.signal(Role::O).unwrap()).unwrap();
    let clk = bridge.source_of(led.signal(Role::OClk).unwrap()).unwrap();

    // The logical output reaches the pad only through a register on o_clk.
    let sync = bridge
        .host()
        .specials
        .iter()
        .find(|s| matches!(s, Special::SdrOutput { i, .. } if *i == o))
        .unwrap();
    let Special::SdrOutput { o: pad, clk: sync_clk, .. } = sync else {
        unreachable!()
    };
    assert_eq!(*sync_clk, clk);
    assert_eq!(bridge.host().signal(*pad).name, "led");
    assert!(bridge.host().driver(*pad).is_none());
}

#[test]
fn active_low_pads_are_inverted_by_value() {
    let dir = tempfile::tempdir().unwrap();
    let mut platform = platform(dir.path());
    let mut bridge = bridge(&platform);

    let mut proxy = PlatformProxy::new(&mut bridge, &mut platform);
    let btn = proxy
        .request("btn", None, Some(Direction::Input.into()), None)
        .unwrap();
    let led = proxy
        .request("user_led", None, Some(Direction::Output.into()), None)
        .unwrap();
    let (btn_i, led_o) = (btn.signal(Role::I).unwrap(), led.signal(Role::O).unwrap());
    bridge.guest_mut().comb(led_o, btn_i);
    let btn_pad = bridge.source_of(btn_i).unwrap();
    let led_pad = bridge.source_of(led_o).unwrap();
    bridge.finalize(&mut platform).unwrap();

    let host = bridge.host();
    let instance = host.instances().next().unwrap();
    let btn_inside = instance.port("i_pad_btn_i").unwrap();
    let led_inside = instance.port("o_pad_user_led_o").unwrap();
    assert_ne!(btn_inside, btn_pad);
    assert_ne!(led_inside, led_pad);

    // Pad to guest: the guest sees the complement of the pins.
    let values = host.evaluate(&HashMap::from([(btn_pad, 0b1010)]));
    assert_eq!(values[&btn_inside], 0b0101);

    // Guest to pad: the pins carry the complement of the guest's value.
    let values = host.evaluate(&HashMap::from([(led_inside, 0b0011)]));
    assert_eq!(values[&led_pad], 0b1100);
    let values = host.evaluate(&HashMap::from([(led_inside, 0)]));
    assert_eq!(values[&led_pad], 0b1111);
}

#[test]
fn double_rate_bidirectional_is_a_configuration_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut platform = platform(dir.path());
    let mut bridge = bridge(&platform);
    let err = PlatformProxy::new(&mut bridge, &mut platform)
        .request("sdram_dq", None, Some(Direction::InOut.into()), Some(2u8.into()))
        .unwrap_err();
    assert!(matches!(err, BridgeError::UnsupportedPad(_)));
    assert_eq!(err.to_string(), "pad direction 'io' at rate 2 is not supported");
    assert!(bridge.host().specials.is_empty());
    assert!(bridge.connections().is_empty());
}

#[test]
fn unknown_resource_is_a_platform_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut platform = platform(dir.path());
    let mut bridge = bridge(&platform);
    let err = PlatformProxy::new(&mut bridge, &mut platform)
        .request("led", Some(3), Some(Direction::Output.into()), None)
        .unwrap_err();
    assert_eq!(err.to_string(), "platform error: platform has no resource 'led_3'");
}

#[test]
fn requests_after_finalize_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut platform = platform(dir.path());
    let mut bridge = bridge(&platform);
    bridge.finalize(&mut platform).unwrap();
    let err = PlatformProxy::new(&mut bridge, &mut platform)
        .request("led", None, Some(Direction::Output.into()), None)
        .unwrap_err();
    assert!(matches!(err, BridgeError::PhaseViolation { .. }));
    assert!(bridge.finalize(&mut platform).is_err());
}
