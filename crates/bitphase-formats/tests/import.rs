use bitphase_ay::{Project, SongSimulator};
use bitphase_formats::{FormatError, import_module, import_vt2, parse_vt2, write_vt2};
use pretty_assertions::assert_eq;

const EMPTY_CELLS: &str = "--- .... ....|--- .... ....";

fn chip(title: &str, order: &str, patterns: &[(usize, &str)]) -> String {
    let mut text = format!(
        "[Module]\nVortexTrackerII=1\nVersion=3.6\nTitle={title}\nAuthor=tester\nNoteTable=2\n\
         ChipFreq=1773400\nIntFreq=50000\nSpeed=3\nPlayOrder={order}\n\n\
         [Ornament0]\nL0\n\n[Ornament1]\nL0,4,7\n\n\
         [Sample1]\nTne +000_ +00_ F_ L\n\n[Sample2]\nTNe +001^ +02_ C- L\n\n"
    );
    for (number, note) in patterns {
        text.push_str(&format!(
            "[Pattern{number}]\n....|..|{note} 2F1F ....|{EMPTY_CELLS}\n....|..|--- .... ....|{EMPTY_CELLS}\n\n"
        ));
    }
    text
}

fn ticks(project: &Project, song: usize) -> usize {
    let mut simulator = SongSimulator::new(project, song, 44_100).unwrap();
    std::iter::from_fn(|| simulator.step_tick()).count()
}

#[test]
fn turbosound_orders_are_unified() {
    let text = chip("left", "L0,1,2", &[(0, "C-4"), (1, "D-4"), (2, "E-4")])
        + &chip("right", "L0,1,3", &[(0, "C-5"), (1, "D-5"), (3, "F-5")]);
    let project = import_vt2(&text).unwrap();

    assert_eq!(project.name, "left");
    assert_eq!(project.songs.len(), 2);
    assert_eq!(project.pattern_order, vec![0, 1, 2]);

    let note = |song: usize, id: usize| {
        project.songs[song].pattern(id).unwrap().channels[0].rows[0]
            .note
            .to_text()
    };
    assert_eq!(note(0, 2), "E-4");
    assert_eq!(note(1, 2), "F-5");

    // chip 2 instruments and tables sit past chip 1's ids
    let instruments: Vec<u16> = project.instruments.iter().map(|i| i.id).collect();
    assert_eq!(instruments, vec![1, 2, 3, 4]);
    let tables: Vec<i32> = project.tables.iter().map(|t| t.id).collect();
    assert_eq!(tables, vec![1, 2]);
    let row = &project.songs[1].pattern(0).unwrap().channels[0].rows[0];
    assert_eq!((row.instrument, row.table), (4, 2));
}

#[test]
fn imported_songs_play_to_the_end() {
    let text = chip("left", "L0,1,2", &[(0, "C-4"), (1, "D-4"), (2, "E-4")])
        + &chip("right", "L0,1,3", &[(0, "C-5"), (1, "D-5"), (3, "F-5")]);
    let project = import_vt2(&text).unwrap();
    // 3 positions, 2 rows, speed 3
    assert_eq!(ticks(&project, 0), 18);
    assert_eq!(ticks(&project, 1), 18);
}

#[test]
fn text_survives_a_write_read_cycle() {
    let text = chip("cycle", "0,L1", &[(0, "A-3"), (1, "B-3")]);
    let modules = parse_vt2(&text).unwrap();
    assert_eq!(parse_vt2(&write_vt2(&modules)).unwrap(), modules);
    assert_eq!(modules[0].loop_position, 1);
}

#[test]
fn missing_pattern_fails_the_whole_import() {
    let text = chip("broken", "0,7", &[(0, "C-4")]);
    match import_module(text.as_bytes(), Some("vt2")) {
        Err(FormatError::Project(err)) => assert!(err.to_string().contains("Pattern 7")),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn pt3_magic_is_validated() {
    let err = import_module(b"ZXAYEMUL\x01\x02not a pt3 file, padding....", Some("pt3")).unwrap_err();
    assert!(matches!(err, FormatError::InvalidHeader { .. }));
    assert!(err.to_string().contains("ZXAYEMUL.."));
}
