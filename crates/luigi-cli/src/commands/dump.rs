use std::fs;

use anyhow::Context as _;
use luigi_lang::Luigi;

use crate::{Context, args::DumpCommand};

impl Context {
    pub fn execute_dump(&mut self, cmd: DumpCommand) -> Result<(), anyhow::Error> {
        let input = fs::read_to_string(&cmd.path)
            .with_context(|| format!("cannot read script \"{}\"", cmd.path))?;
        let program = Luigi::new().compile(&input)?;
        print!("{program}");
        Ok(())
    }
}
