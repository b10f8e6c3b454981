//! Keyfile-to-repository loading against a realistic device configuration.

use blinkd::config::KeyFile;
use blinkd::patterns::graph::ActivationGraph;
use blinkd::patterns::{BackendFamily, PatternRepository, VisibilityPolicy};

use crate::mock_hw::MemorySettings;

const DEVICE_CONF: &str = "\
# Typical RGB engine device.
[LED]
Backend=engine-rgb-b
PatternGroup=LedPatternsRgbB
RequiredPatterns=PatternBatteryCharging,PatternBatteryFull,PatternCommunication,PatternCommunicationCall,PatternCommunicationIM,PatternBatteryLow,PatternBroken
DisabledPatterns=PatternBatteryLow
CombinationRules=CommunicationRule

[LedPatternsRgbB]
PatternBatteryCharging=30,4,0,4a20ff0045,,0300
PatternBatteryFull=20,4,0,4a20ff45,,0300
PatternCommunication=15,6,600,4a10ff2045,4a10ff2045,0104
PatternCommunicationCall=16,6,600,4a10ff2045,,0100
PatternCommunicationIM=17,6,600,4a10ff2045,,0100
PatternBatteryLow=40,2,0,4a08ff45,,0100
PatternBroken=10,9,0,4a08ff45,,0100
CommunicationRule=PatternCommunication,PatternCommunicationCall,PatternCommunicationIM
";

#[test]
fn device_configuration_loads_end_to_end() {
    let keyfile = KeyFile::parse(DEVICE_CONF);
    let mut settings = MemorySettings::default();
    settings.patterns.insert("PatternBatteryFull".into(), false);

    let repo =
        PatternRepository::load(BackendFamily::EngineRgbB, &keyfile, &settings).unwrap();

    // PatternBatteryLow suppressed by the disabled list; PatternBroken
    // rejected (policy 9 is outside the closed set).
    assert!(repo.find("PatternBatteryLow").is_none());
    assert!(repo.find("PatternBroken").is_none());
    assert_eq!(repo.len(), 5);

    // Ascending priority order.
    let priorities: Vec<u32> = repo.patterns().iter().map(|p| p.priority).collect();
    let mut sorted = priorities.clone();
    sorted.sort_unstable();
    assert_eq!(priorities, sorted);

    // The stored user toggle overrides the enabled default.
    assert!(!repo.get(repo.find("PatternBatteryFull").unwrap()).enabled);
    assert!(repo.get(repo.find("PatternBatteryCharging").unwrap()).enabled);

    // Field mapping for the muxed family.
    let call = repo.get(repo.find("PatternCommunicationCall").unwrap());
    assert_eq!(call.policy, VisibilityPolicy::Notification);
    assert_eq!(call.timeout, Some(std::time::Duration::from_secs(600)));
    assert_eq!(call.channels[0].as_str(), "4a10ff2045");
    assert!(call.channels[1].is_empty());
    assert_eq!((call.engine1_mux, call.engine2_mux), (0x01, 0x00));

    // Combination rule resolves against loaded patterns.
    let graph = ActivationGraph::from_config(&keyfile, &repo);
    assert_eq!(graph.len(), 1);
    assert_eq!(graph.rule(0).derived, "PatternCommunication");
    assert_eq!(graph.affected_by("PatternCommunicationCall"), &[0]);
}

#[test]
fn rule_referencing_a_suppressed_pattern_is_dropped() {
    let conf = DEVICE_CONF.replace(
        "CommunicationRule=PatternCommunication,PatternCommunicationCall,PatternCommunicationIM",
        "CommunicationRule=PatternCommunication,PatternBatteryLow",
    );
    let keyfile = KeyFile::parse(&conf);
    let repo = PatternRepository::load(
        BackendFamily::EngineRgbB,
        &keyfile,
        &MemorySettings::default(),
    )
    .unwrap();
    let graph = ActivationGraph::from_config(&keyfile, &repo);
    assert!(graph.is_empty());
}
