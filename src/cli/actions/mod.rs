pub mod server;

use anyhow::Result;

pub enum Action {
    Server(server::Args),
}

impl Action {
    /// Execute the selected action.
    ///
    /// # Errors
    /// Propagates the action's failure.
    pub async fn execute(self) -> Result<()> {
        match self {
            Self::Server(args) => server::execute(args).await,
        }
    }
}
