use std::fs;

use anyhow::Context as _;
use luigi_lang::{Luigi, VmOptions};

use crate::{Context, args::RunCommand};

impl Context {
    pub fn execute_run(&mut self, cmd: RunCommand) -> Result<(), anyhow::Error> {
        let input = fs::read_to_string(&cmd.path)
            .with_context(|| format!("cannot read script \"{}\"", cmd.path))?;
        let mut luigi = Luigi::with_options(VmOptions {
            max_call_depth: cmd.max_call_depth,
        });
        let program = luigi.compile(&input)?;
        log::info!("running {}", cmd.path);
        // Runtime errors hold script values, which cannot cross threads.
        luigi
            .execute(program)
            .map_err(|err| anyhow::Error::msg(err.to_string()))?;
        Ok(())
    }
}
