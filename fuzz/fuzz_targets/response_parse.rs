//! Arbitrary oracle bodies must parse or fail cleanly, and anything that
//! parses must render or fail cleanly.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use sculpt_oracle::{parse_edit_proposal, parse_scene};
use sculpt_script::{Dialect, EmitterConfig, ScriptEmitter, UnsupportedPolicy};

#[derive(Arbitrary, Debug)]
struct Input<'a> {
    body: &'a str,
    openscad: bool,
    skip_unsupported: bool,
    precision: u8,
}

fuzz_target!(|input: Input<'_>| {
    let _ = parse_edit_proposal(input.body);

    if let Ok(scene) = parse_scene(input.body) {
        let emitter = ScriptEmitter::new(EmitterConfig {
            dialect: if input.openscad { Dialect::OpenScad } else { Dialect::BlenderPython },
            unsupported: if input.skip_unsupported {
                UnsupportedPolicy::Skip
            } else {
                UnsupportedPolicy::Abort
            },
            precision: (input.precision % 9) as usize,
        });
        let _ = emitter.render_scene(&scene);
    }
});
