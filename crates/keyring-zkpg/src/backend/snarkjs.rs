//! # snarkjs Process Backend
//!
//! Runs `snarkjs groth16 fullprove` in a scratch directory:
//!
//! ```text
//! snarkjs groth16 fullprove input.json circuit.wasm circuit.zkey proof.json public.json
//! ```
//!
//! The scratch directory is removed when the call returns.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;

use super::ProvingBackend;
use crate::circuit::{CircuitSetup, FullProveOutput, Groth16Proof, WitnessInputs};
use crate::error::ProvingError;

/// Shells out to the `snarkjs` CLI.
#[derive(Debug, Clone)]
pub struct SnarkjsBackend {
    program: PathBuf,
}

impl Default for SnarkjsBackend {
    fn default() -> Self {
        Self::new("snarkjs")
    }
}

impl SnarkjsBackend {
    /// Backend invoking `program`.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// The executable invoked.
    pub fn program(&self) -> &Path {
        &self.program
    }
}

async fn write(path: &Path, bytes: &[u8]) -> Result<(), ProvingError> {
    tokio::fs::write(path, bytes)
        .await
        .map_err(|e| ProvingError::Prover(format!("failed to write {}: {e}", path.display())))
}

async fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, ProvingError> {
    match tokio::fs::read(path).await {
        Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(None),
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ProvingError::Output(format!("failed to read {}: {e}", path.display()))),
    }
}

#[async_trait]
impl ProvingBackend for SnarkjsBackend {
    fn name(&self) -> &'static str {
        "snarkjs"
    }

    async fn full_prove(
        &self,
        setup: &CircuitSetup,
        inputs: &WitnessInputs,
    ) -> Result<Option<FullProveOutput>, ProvingError> {
        let scratch = tempfile::Builder::new()
            .prefix("keyring-zkpg-")
            .tempdir()
            .map_err(|e| ProvingError::Prover(format!("failed to create scratch dir: {e}")))?;
        let dir = scratch.path();
        let input = dir.join("input.json");
        let wasm = dir.join("circuit.wasm");
        let zkey = dir.join("circuit.zkey");
        let proof_path = dir.join("proof.json");
        let public_path = dir.join("public.json");

        let input_json = serde_json::to_vec(inputs)
            .map_err(|e| ProvingError::Witness(format!("failed to serialize inputs: {e}")))?;
        write(&input, &input_json).await?;
        write(&wasm, setup.wasm()).await?;
        write(&zkey, setup.z_key()).await?;

        tracing::debug!(
            program = %self.program.display(),
            circuit = %setup.fingerprint(),
            "running snarkjs fullprove"
        );
        let output = Command::new(&self.program)
            .args(["groth16", "fullprove"])
            .args([&input, &wasm, &zkey, &proof_path, &public_path])
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                ProvingError::Prover(format!("failed to run {}: {e}", self.program.display()))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            let detail = if stderr.trim().is_empty() { stdout } else { stderr };
            return Err(ProvingError::Prover(format!(
                "snarkjs exited with {}: {}",
                output.status,
                detail.trim()
            )));
        }

        let proof = read_optional(&proof_path).await?;
        let public = read_optional(&public_path).await?;
        let (Some(proof), Some(public)) = (proof, public) else {
            tracing::warn!("snarkjs succeeded without writing a proof");
            return Ok(None);
        };
        let proof: Groth16Proof = serde_json::from_slice(&proof)
            .map_err(|e| ProvingError::Output(format!("proof.json: {e}")))?;
        let public_signals: Vec<String> = serde_json::from_slice(&public)
            .map_err(|e| ProvingError::Output(format!("public.json: {e}")))?;
        Ok(Some(FullProveOutput {
            proof,
            public_signals,
        }))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::artifacts::ZkArtifacts;
    use std::os::unix::fs::PermissionsExt;
    use std::sync::Arc;

    fn setup() -> CircuitSetup {
        CircuitSetup::new(Arc::new(ZkArtifacts {
            z_key: b"zkey".to_vec(),
            wasm: b"wasm".to_vec(),
            symbol_map: serde_json::json!({}),
        }))
    }

    /// Write an executable shell script standing in for snarkjs.
    fn fake_snarkjs(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("snarkjs");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[tokio::test]
    async fn parses_proof_and_public_files() {
        let bin = tempfile::tempdir().unwrap();
        // $6 is proof.json, $7 is public.json.
        let script = fake_snarkjs(
            bin.path(),
            concat!(
                r#"echo '{"pi_a":["1","2","1"],"pi_b":[["3","4"],["5","6"],["1","0"]],"#,
                r#""pi_c":["7","8","1"],"protocol":"groth16","curve":"bn128"}' > "$6""#,
                "\n",
                r#"echo '["99","1"]' > "$7""#,
            ),
        );
        let out = SnarkjsBackend::new(script)
            .full_prove(&setup(), &WitnessInputs::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(out.proof.pi_a, vec!["1", "2", "1"]);
        assert_eq!(out.public_signals, vec!["99", "1"]);
    }

    #[tokio::test]
    async fn failing_process_reports_stderr() {
        let bin = tempfile::tempdir().unwrap();
        let script = fake_snarkjs(bin.path(), "echo 'constraint doesnt match' >&2\nexit 1");
        let err = SnarkjsBackend::new(script)
            .full_prove(&setup(), &WitnessInputs::default())
            .await
            .unwrap_err();
        match err {
            ProvingError::Prover(msg) => assert!(msg.contains("constraint doesnt match")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_output_is_empty() {
        let bin = tempfile::tempdir().unwrap();
        let script = fake_snarkjs(bin.path(), "exit 0");
        let out = SnarkjsBackend::new(script)
            .full_prove(&setup(), &WitnessInputs::default())
            .await
            .unwrap();
        assert!(out.is_none());
    }

    #[tokio::test]
    async fn missing_program_is_a_prover_error() {
        let err = SnarkjsBackend::new("/nonexistent/snarkjs")
            .full_prove(&setup(), &WitnessInputs::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ProvingError::Prover(_)));
    }
}
