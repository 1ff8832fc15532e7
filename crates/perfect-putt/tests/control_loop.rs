use approx::assert_relative_eq;
use perfect_putt::core::{CandidateRole, PuttConfig};
use perfect_putt::replay::{run_scenario, Scenario, TransmitOp};
use perfect_putt::telemetry::{ChannelId, PacketKind, ShotPacket, TelemetryPacket};
use perfect_putt::{LoopStats, SkipReason};
use std::path::{Path, PathBuf};

fn testdata_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../testdata")
        .join(name)
}

fn load_session() -> Scenario {
    Scenario::load_json(testdata_path("scenarios/putt_session.json")).expect("load scenario")
}

fn from_hex(s: &str) -> Vec<u8> {
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).expect("hex"))
        .collect()
}

#[test]
fn session_counters_match_the_script() {
    let report = run_scenario(PuttConfig::default(), &load_session()).expect("replay");
    assert_eq!(report.name, "putt_session");
    assert_eq!(
        report.stats,
        LoopStats {
            iterations: 9,
            skipped: 1,
            shots: 2,
            impacts: 2,
            sensor_streams: 5,
            notifications: 5,
            dispatch_failures: 1,
        }
    );
    assert_eq!(report.advertising_restarts, 1);
}

#[test]
fn shot_distance_uses_both_apparent_sizes() {
    let report = run_scenario(PuttConfig::default(), &load_session()).expect("replay");
    let tick = &report.ticks[1];

    let ball = tick.iteration.selection.ball.expect("ball");
    let hole = tick.iteration.selection.hole.expect("hole");
    assert_eq!(ball.role, CandidateRole::Ball);
    // The glare blob and the too-small shadow must lose.
    assert_eq!(ball.region.pixel_count, 314);
    assert_eq!(hole.region.area, 480);

    let estimate = tick.iteration.estimate.expect("estimate");
    let b = estimate.ball.expect("ball position");
    let h = estimate.hole.expect("hole position");
    assert_relative_eq!(b.z, 146.0 * 0.04267 / 20.0, epsilon = 1e-5);
    assert_relative_eq!(h.z, 146.0 * 0.108 / 26.0, epsilon = 1e-5);

    let shot = tick.iteration.shot.expect("shot");
    assert_relative_eq!(shot.distance_m, 0.42766, epsilon = 1e-3);
    assert_eq!(shot.force, 299);
}

#[test]
fn unsubscribed_shot_is_value_only_then_notified_once_subscribed() {
    let report = run_scenario(PuttConfig::default(), &load_session()).expect("replay");

    let before: Vec<_> = report.ticks[1]
        .transmissions
        .iter()
        .map(|r| (r.op, r.channel))
        .collect();
    assert_eq!(before, vec![(TransmitOp::SetValue, ChannelId::Packet)]);

    let after = &report.ticks[2].transmissions;
    assert_eq!(after.len(), 2);
    assert_eq!(after[1].op, TransmitOp::Notify);
    assert_eq!(after[1].channel, ChannelId::Packet);
    assert_eq!(after[1].kind, Some(PacketKind::Shot));

    let decoded = ShotPacket::decode(&from_hex(&after[1].hex)).expect("decode shot");
    assert_eq!(Some(decoded), report.ticks[2].iteration.shot);
}

#[test]
fn impact_cooldown_spans_ticks() {
    let report = run_scenario(PuttConfig::default(), &load_session()).expect("replay");
    let impacts: Vec<u64> = report
        .ticks
        .iter()
        .filter_map(|t| t.iteration.impact.map(|e| e.timestamp_ms))
        .collect();
    assert_eq!(impacts, vec![120, 700]);

    let rec = report.ticks[3]
        .transmissions
        .iter()
        .find(|r| r.channel == ChannelId::Impact)
        .expect("impact value");
    // Impact channel never subscribed in this session.
    assert_eq!(rec.op, TransmitOp::SetValue);
    match TelemetryPacket::decode(&from_hex(&rec.hex)).expect("decode") {
        TelemetryPacket::Impact(p) => {
            assert_eq!(p.timestamp_ms, 120);
            assert_relative_eq!(p.voltage, 1.5);
            assert_relative_eq!(p.accel[2], 9.81);
        }
        other => panic!("unexpected packet {other:?}"),
    }
}

#[test]
fn failed_sensor_read_skips_the_whole_tick() {
    let report = run_scenario(PuttConfig::default(), &load_session()).expect("replay");
    let tick = &report.ticks[6];
    assert!(matches!(tick.iteration.skipped, Some(SkipReason::Sensor(_))));
    assert!(tick.transmissions.is_empty());
    assert!(tick.iteration.selection.ball.is_none());
}

#[test]
fn disconnect_silences_notifications_but_not_values() {
    let report = run_scenario(PuttConfig::default(), &load_session()).expect("replay");
    assert!(!report.ticks[7].iteration.link.is_connected());

    // Tick 8 runs with a failing radio: the stream attempt fails, the loop goes on.
    let last = &report.ticks[8];
    assert!(last.iteration.sensor_stream);
    assert_eq!(last.iteration.dispatch_failures, 1);
    assert!(last.transmissions.is_empty());
    assert!(last.iteration.skipped.is_none());
}

#[test]
fn tighter_cooldown_changes_the_outcome() {
    let mut config = PuttConfig::default();
    config.impact.cooldown_ms = 100;
    let report = run_scenario(config, &load_session()).expect("replay");
    // 120, 300 and 700 all clear a 100 ms cooldown.
    assert_eq!(report.stats.impacts, 3);
}

#[test]
fn invalid_config_is_rejected_before_replay() {
    let mut config = PuttConfig::default();
    config.camera.focal_px = 0.0;
    assert!(run_scenario(config, &load_session()).is_err());
}

#[test]
fn report_serializes_to_json() {
    let report = run_scenario(PuttConfig::default(), &load_session()).expect("replay");
    let json = serde_json::to_value(&report).expect("serialize");
    assert_eq!(json["stats"]["shots"], 2);
    assert_eq!(json["ticks"][6]["skipped"]["input"], "sensor");
    assert_eq!(json["ticks"][0]["link"]["subscribed"][0], "sensor");
}
