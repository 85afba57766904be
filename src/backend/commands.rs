//! Developer-console backend: emits the stub command parser unit.

use anyhow::Result;

use super::Backend;
use crate::record::RecordKeeper;

pub struct CommandsBackend;

const STUB: &str = r#"
using System.Collections.Generic;

namespace Transidious
{

public class DeveloperConsoleInternals
{
    public void ParseCommand(string rawCmd)
    {

    }
}

}
"#;

impl Backend for CommandsBackend {
    fn generate(&self, _keeper: &RecordKeeper) -> Result<String> {
        Ok(STUB.to_string())
    }
}
