//! Interactive `.env` generator.
//!
//! The wizard is a fixed, forward-only list of steps: each step prompts,
//! validates the answer and stores it. An invalid answer aborts the whole
//! wizard and nothing is written.

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use rand::RngCore;
use tracing::info;

use crate::error::WizardError;

pub const ENV_FILE: &str = ".env";

/// Bytes of randomness behind the generated signing secret.
const SECRET_BYTES: usize = 64;

struct Step {
    key: &'static str,
    label: &'static str,
    prompt: &'static str,
    validate: fn(&str) -> Result<(), &'static str>,
}

const STEPS: [Step; 2] = [
    Step {
        key: "OPENAI_API_KEY",
        label: "OpenAI API key",
        prompt: "Enter your OpenAI API key (starts with sk-): ",
        validate: validate_api_key,
    },
    Step {
        key: "MONGODB_URI",
        label: "MongoDB URI",
        prompt: "Enter your MongoDB connection string: ",
        validate: validate_mongo_uri,
    },
];

fn validate_api_key(answer: &str) -> Result<(), &'static str> {
    if answer.starts_with("sk-") {
        Ok(())
    } else {
        Err("should start with \"sk-\"")
    }
}

fn validate_mongo_uri(answer: &str) -> Result<(), &'static str> {
    if answer.contains("mongodb") {
        Ok(())
    } else {
        Err("should start with \"mongodb://\" or \"mongodb+srv://\"")
    }
}

pub fn generate_secret(rng: &mut impl RngCore) -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    rng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Runs the wizard and writes `<root>/.env`, returning its path.
pub fn run_setup(
    root: &Path,
    mut input: impl BufRead,
    mut output: impl Write,
    rng: &mut impl RngCore,
) -> Result<PathBuf, WizardError> {
    let path = root.join(ENV_FILE);
    if path.exists() {
        return Err(WizardError::AlreadyExists { path });
    }

    writeln!(output, "This will create a {ENV_FILE} file with your configuration.")?;
    writeln!(output, "Never share these values with anyone!\n")?;

    let mut answers = BTreeMap::new();
    answers.insert("JWT_SECRET", generate_secret(rng));
    writeln!(output, "Generated secure JWT secret")?;

    for step in &STEPS {
        write!(output, "{}", step.prompt)?;
        output.flush()?;
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Err(WizardError::Eof { step: step.label });
        }
        let answer = line.trim();
        (step.validate)(answer).map_err(|reason| WizardError::Invalid {
            step: step.label,
            reason,
        })?;
        answers.insert(step.key, answer.to_string());
    }

    let contents = render_env_file(&answers);
    let mut file = OpenOptions::new().write(true).create_new(true).open(&path)?;
    file.write_all(contents.as_bytes())?;
    info!(path = %path.display(), "wrote env file");

    writeln!(output, "\n{ENV_FILE} file created at {}", path.display())?;
    writeln!(output, "Never commit {ENV_FILE} files to version control!")?;
    Ok(path)
}

fn render_env_file(answers: &BTreeMap<&'static str, String>) -> String {
    let get = |key: &str| answers.get(key).map(String::as_str).unwrap_or_default();
    format!(
        "# Environment Configuration\n\
         NODE_ENV=development\n\
         \n\
         # OpenAI Configuration\n\
         OPENAI_API_KEY={}\n\
         \n\
         # Database Configuration\n\
         MONGODB_URI={}\n\
         \n\
         # JWT Configuration\n\
         JWT_SECRET={}\n\
         \n\
         # Server Configuration\n\
         PORT=3000\n",
        get("OPENAI_API_KEY"),
        get("MONGODB_URI"),
        get("JWT_SECRET"),
    )
}

#[cfg(test)]
mod tests {
    use std::fs;

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::snapshot::parse_dotenv;

    #[test]
    fn writes_env_file_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        let mut out = Vec::new();
        let path = run_setup(
            dir.path(),
            "sk-test-key\nmongodb+srv://user@cluster/db\n".as_bytes(),
            &mut out,
            &mut rng,
        )
        .unwrap();

        let vars = parse_dotenv(&fs::read_to_string(path).unwrap());
        assert_eq!(vars["NODE_ENV"], "development");
        assert_eq!(vars["OPENAI_API_KEY"], "sk-test-key");
        assert_eq!(vars["MONGODB_URI"], "mongodb+srv://user@cluster/db");
        assert_eq!(vars["PORT"], "3000");
        assert_eq!(vars["JWT_SECRET"].len(), SECRET_BYTES * 2);
        assert!(vars["JWT_SECRET"].chars().all(|c| c.is_ascii_hexdigit()));

        let transcript = String::from_utf8(out).unwrap();
        let api_prompt = transcript.find("OpenAI API key").unwrap();
        let mongo_prompt = transcript.find("MongoDB connection string").unwrap();
        assert!(api_prompt < mongo_prompt);
    }

    #[test]
    fn secret_is_seed_deterministic() {
        let a = generate_secret(&mut StdRng::seed_from_u64(7));
        let b = generate_secret(&mut StdRng::seed_from_u64(7));
        let c = generate_secret(&mut StdRng::seed_from_u64(8));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn invalid_answer_aborts_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let err = run_setup(
            dir.path(),
            "not-a-key\n".as_bytes(),
            Vec::new(),
            &mut StdRng::seed_from_u64(1),
        )
        .unwrap_err();
        assert!(matches!(err, WizardError::Invalid { step: "OpenAI API key", .. }));
        assert!(!dir.path().join(ENV_FILE).exists());

        let err = run_setup(
            dir.path(),
            "sk-ok\npostgres://db\n".as_bytes(),
            Vec::new(),
            &mut StdRng::seed_from_u64(1),
        )
        .unwrap_err();
        assert!(matches!(err, WizardError::Invalid { step: "MongoDB URI", .. }));
        assert!(!dir.path().join(ENV_FILE).exists());
    }

    #[test]
    fn refuses_to_overwrite_and_reports_eof() {
        let dir = tempfile::tempdir().unwrap();
        let err = run_setup(dir.path(), "sk-x\n".as_bytes(), Vec::new(), &mut StdRng::seed_from_u64(1))
            .unwrap_err();
        assert!(matches!(err, WizardError::Eof { step: "MongoDB URI" }));

        fs::write(dir.path().join(ENV_FILE), "PORT=1\n").unwrap();
        let err = run_setup(dir.path(), "".as_bytes(), Vec::new(), &mut StdRng::seed_from_u64(1))
            .unwrap_err();
        assert!(matches!(err, WizardError::AlreadyExists { .. }));
    }
}
