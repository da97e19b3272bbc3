use crate::{
    Context,
    args::{LuigiCliArgs, LuigiCliCommand},
};

mod dump;
mod run;

impl Context {
    pub fn execute(&mut self, args: LuigiCliArgs) -> Result<(), anyhow::Error> {
        match args.cmd {
            LuigiCliCommand::Run(cmd) => self.execute_run(cmd),
            LuigiCliCommand::Dump(cmd) => self.execute_dump(cmd),
        }
    }
}
