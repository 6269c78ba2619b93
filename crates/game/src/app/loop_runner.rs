use std::process::ExitCode;

use engine::run_app;
use tracing::error;

use super::bootstrap::{AppWiring, BootstrapError};

pub(crate) fn run(app: Result<AppWiring, BootstrapError>) -> ExitCode {
    let app = match app {
        Ok(app) => app,
        Err(err) => {
            error!(error = %err, "startup_failed");
            return ExitCode::FAILURE;
        }
    };

    if let Err(err) = run_app(app.config, app.scene) {
        error!(error = %err, "startup_failed");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
