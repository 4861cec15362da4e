//! Project loading, saving and validation.

use std::path::Path;

use pd_project::schema::Project;

use crate::error::{AppError, AppResult};

/// Load a project from a `.yaml`/`.yml` or `.json` file.
pub fn load_project(path: &Path) -> AppResult<Project> {
    if !path.exists() {
        return Err(AppError::ProjectFileRead {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        });
    }
    Ok(pd_project::load(path)?)
}

/// Save a project, choosing the format from the extension.
pub fn save_project(path: &Path, project: &Project) -> AppResult<()> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => pd_project::save_json(path, project)?,
        Some("yaml" | "yml") => pd_project::save_yaml(path, project)?,
        _ => {
            return Err(AppError::InvalidInput(format!(
                "Unknown project file extension: {}",
                path.display()
            )));
        }
    }
    Ok(())
}

/// Validate the project file and check that it compiles into a model.
pub fn validate_project(project: &Project) -> AppResult<()> {
    pd_project::validate_project(project)?;
    crate::compile::compile_model(project)?;
    Ok(())
}
