use crate::types::JobId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: JobId },

    #[error("Validation failed: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_cause() {
        let id = crate::types::new_job_id();
        let err = CoreError::NotFound { entity: "Task", id };
        assert_eq!(err.to_string(), format!("Entity not found: Task with id {id}"));

        let err = CoreError::Validation("bad model".into());
        assert_eq!(err.to_string(), "Validation failed: bad model");
    }
}
