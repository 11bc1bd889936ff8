use pcbmill_camtools::{
    CoordinateMode, CutOrchestrator, CutProfile, FileSink, GeneratorSettings, HoldersToolpath,
    IsolationToolpath, MachineConfig, Operation, OperationOutcome, ToolpathGenerator,
};
use pcbmill_core::{Point, Ring, Shape};
use std::fs;
use tempfile::TempDir;

fn square(x: f64, y: f64, size: f64) -> Shape {
    Shape::new(Ring::rectangle(
        Point::new(x, y),
        Point::new(x + size, y + size),
    ))
}

fn word(line: &str, letter: char) -> Option<f64> {
    line.split_whitespace()
        .skip(1)
        .find(|w| w.starts_with(letter))
        .and_then(|w| w[1..].parse().ok())
}

#[test]
fn test_isolation_job_writes_crlf_file() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("top.gcode");

    let mut generator = ToolpathGenerator::new(IsolationToolpath::default());
    generator.add_tool(0.4).unwrap();
    let paths = generator
        .generate(&[square(0.0, 0.0, 2.0), square(5.0, 0.0, 2.0)])
        .unwrap();
    assert_eq!(paths.len(), 2);

    let config = MachineConfig {
        coordinate_mode: CoordinateMode::Relative,
        ..MachineConfig::default()
    };
    let sink = FileSink::create(&file).unwrap();
    let mut orchestrator = CutOrchestrator::from_config(config, sink).unwrap();
    let outcome = orchestrator.execute(&Operation::Mill(paths)).unwrap();
    assert_eq!(outcome, OperationOutcome::Completed { paths: 2 });
    drop(orchestrator);

    let text = fs::read_to_string(&file).unwrap();
    assert!(text.starts_with("G92 X0 Y0 Z0\r\nG91\r\nG0 Z5 F1000\r\n"));
    assert!(text.contains("; Path #2\r\n"));
    assert!(text.ends_with("; Spindle is off\r\n"));
}

#[test]
fn test_relative_deltas_sum_to_path_start() {
    let mut generator = ToolpathGenerator::new(IsolationToolpath::default());
    generator.add_tool(2.0).unwrap();
    let paths = generator.generate(&[square(0.0, 0.0, 10.0)]).unwrap();
    let start = *paths[0].first().unwrap();

    let config = MachineConfig {
        coordinate_mode: CoordinateMode::Relative,
        ..MachineConfig::default()
    };
    let mut orchestrator = CutOrchestrator::from_config(config, Vec::new()).unwrap();
    orchestrator.execute(&Operation::Mill(paths)).unwrap();

    let (mut x, mut y, mut z) = (0.0, 0.0, 0.0);
    for line in orchestrator.into_sink() {
        if line.starts_with("G0") || line.starts_with("G1") {
            x += word(&line, 'X').unwrap_or(0.0);
            y += word(&line, 'Y').unwrap_or(0.0);
            z += word(&line, 'Z').unwrap_or(0.0);
        }
    }
    // closed path ends where it began, lifted to travel height
    assert!((x - start.x).abs() < 1e-6);
    assert!((y - start.y).abs() < 1e-6);
    assert!((z - 5.0).abs() < 1e-6);
}

#[test]
fn test_outline_with_holders_keeps_tabs() {
    let board = [square(0.0, 0.0, 20.0)];

    let mut outline = ToolpathGenerator::new(IsolationToolpath::default());
    outline.add_tool(2.0).unwrap();
    let outline = outline.generate(&board).unwrap();

    let mut holders = ToolpathGenerator::new(HoldersToolpath::default());
    holders.add_tool(2.0).unwrap();
    let holders = holders.generate(&board).unwrap();
    assert_eq!(holders.len(), 4);

    let mut orchestrator = CutOrchestrator::from_config(MachineConfig::default(), Vec::new()).unwrap();
    let outcome = orchestrator
        .execute(&Operation::CutWithHolders {
            outline,
            holders,
            profile: CutProfile::new(0.0, 0.8, 0.2).unwrap(),
            holder_profile: CutProfile::new(0.8, 1.65, 0.2).unwrap(),
        })
        .unwrap();
    assert_eq!(outcome, OperationOutcome::Completed { paths: 5 });

    let lines = orchestrator.into_sink();
    let split = lines.iter().position(|l| l == "; Cutting Holders").unwrap();
    let deepest = |lines: &[String]| {
        lines
            .iter()
            .filter(|l| l.starts_with("G1"))
            .filter_map(|l| word(l, 'Z'))
            .fold(0.0f64, f64::min)
    };
    assert!((deepest(&lines[..split]) + 0.8).abs() < 1e-9);
    assert!((deepest(&lines[split..]) + 1.65).abs() < 1e-9);
}

#[test]
fn test_connected_generation_reduces_path_count() {
    let mut generator =
        ToolpathGenerator::new(IsolationToolpath::default()).with_settings(GeneratorSettings {
            connect: true,
            order: false,
        });
    generator.add_tool(0.4).unwrap();
    let paths = generator
        .generate(&[square(0.0, 0.0, 10.0), square(11.0, 0.0, 10.0)])
        .unwrap();
    assert_eq!(paths.len(), 1);
    assert!(paths[0].is_closed());
}
