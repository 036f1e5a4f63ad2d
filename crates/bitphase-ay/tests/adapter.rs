use bitphase_ay::{
    AyPatternConverter, Note, NoteName, Pattern, PatternConverter, PatternRow, ay_schema,
    require_chip,
};
use bitphase_common::{Effect, FormatOptions, RowNumberStyle, parse_effect, parse_row};
use pretty_assertions::assert_eq;

fn sample_pattern() -> Pattern {
    let mut pattern = Pattern::new(7, 3, 3);
    for (index, channel) in pattern.channels.iter_mut().enumerate() {
        let row = &mut channel.rows[index];
        row.note = Note::from_index(12 * index + 5).unwrap();
        row.instrument = 10 + index as u16;
        row.volume = 4 + index as u8;
        row.table = if index == 1 { -1 } else { index as i32 };
        row.envelope_shape = [0, 8, 15][index];
        row.effects[0] = parse_effect(["A042", "V1T3", "S006"][index]);
    }
    pattern.channels[0].rows[2].note = Note::off();
    pattern.pattern_rows[2] = PatternRow {
        envelope_value: 0xABCD,
        noise_value: 0x11,
        envelope_effect: Some(Effect::new(14, 3, 0x20)),
    };
    pattern
}

#[test]
fn generic_round_trip() {
    let pattern = sample_pattern();
    let converter = AyPatternConverter;
    assert_eq!(converter.from_generic(&converter.to_generic(&pattern)), pattern);
}

#[test]
fn text_round_trip_through_formatter() {
    let pattern = sample_pattern();
    let chip = require_chip("ay").unwrap();
    let generic = chip.converter().to_generic(&pattern);

    for style in [RowNumberStyle::Hex, RowNumberStyle::Decimal] {
        let options = FormatOptions { row_numbers: style };
        for row in 0..pattern.length {
            let text = chip.format_row(&pattern, row, &options);
            let parsed = parse_row(&text, ay_schema(), &options);
            assert_eq!(parsed.channels.len(), 3, "{text}");
            for (channel, parsed_row) in parsed.channels.iter().enumerate() {
                let expected = bitphase_ay::row_from_generic(&generic.channels[channel].rows[row]);
                assert_eq!(bitphase_ay::row_from_generic(parsed_row), expected, "{text}");
            }
            assert_eq!(
                bitphase_ay::pattern_row_from_generic(&parsed.pattern_row),
                pattern.pattern_rows[row]
            );
        }
    }
}

#[test]
fn note_names_survive() {
    let mut pattern = Pattern::new(0, 1, 1);
    pattern.channels[0].rows[0].note = Note::new(NoteName::GSharp, 8);
    let generic = AyPatternConverter.to_generic(&pattern);
    assert_eq!(generic.channels[0].rows[0].text("note"), Some("G#8"));
}
