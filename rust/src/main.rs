//! Operator CLI. Each command prints the same JSON body the corresponding
//! HTTP endpoint returns, so values can be checked without a running server.

use std::env;
use std::process::ExitCode;

use serde::Serialize;
use serde_json::json;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use directory_gateway::config::{
    read_raw_config, RawGatewayConfig, RuntimeConfig, CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH,
};
use directory_gateway::crypto::codec::{generate_keys, SecretCodec, ValueRequest};
use directory_gateway::directory::gateway::LdapGateway;
use directory_gateway::directory::projector::DirectoryUserProjector;
use directory_gateway::directory::service::DirectoryService;
use directory_gateway::error::GatewayError;

fn print_usage() {
    eprintln!("Commands:\n  generate-keys\n  encrypt <value>\n  decrypt <base64-ciphertext>\n  lookup-user <account-name>\n  list-ou <ou-name>\n  check-config\n\nConfig path is read from {CONFIG_PATH_ENV} (default {DEFAULT_CONFIG_PATH}).");
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn config_path() -> String {
    env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
}

fn load_raw() -> Result<RawGatewayConfig, GatewayError> {
    let raw = read_raw_config(config_path())?;
    init_tracing(raw.log_level());
    Ok(raw)
}

fn print_json<T: Serialize>(value: &T) -> Result<ExitCode, GatewayError> {
    match serde_json::to_string_pretty(value) {
        Ok(text) => {
            println!("{text}");
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            eprintln!("response serialization failed: {err}");
            Ok(ExitCode::FAILURE)
        }
    }
}

// Not found is a normal outcome, but scripts still need a non-zero status.
fn not_found() -> Result<ExitCode, GatewayError> {
    println!("{}", json!({ "error": "not found" }));
    Ok(ExitCode::FAILURE)
}

fn run(command: &str, operands: &[String]) -> Result<ExitCode, GatewayError> {
    match (command, operands) {
        ("generate-keys", []) => {
            init_tracing("info");
            print_json(&generate_keys())
        }
        ("encrypt", [value]) => {
            let cipher = load_raw()?.encryption.build_cipher()?;
            let response = SecretCodec::new(&cipher).encrypt(&ValueRequest { value: value.clone() })?;
            print_json(&response)
        }
        ("decrypt", [value]) => {
            let cipher = load_raw()?.encryption.build_cipher()?;
            let response = SecretCodec::new(&cipher).decrypt(&ValueRequest { value: value.clone() })?;
            print_json(&response)
        }
        ("lookup-user", [account_name]) => {
            let service = directory_service()?;
            match service.lookup_user(account_name)? {
                Some(record) => print_json(&record),
                None => not_found(),
            }
        }
        ("list-ou", [ou]) => {
            let service = directory_service()?;
            match service.list_organizational_unit(ou)? {
                Some(records) => print_json(&records),
                None => not_found(),
            }
        }
        ("check-config", []) => {
            let runtime = RuntimeConfig::from_raw(load_raw()?)?;
            print_json(&json!({
                "domain": runtime.directory.domain,
                "url": runtime.directory.url,
                "baseDn": runtime.directory.base_dn,
                "bindUsername": runtime.credentials.username(),
                "bindPassword": "<redacted in output>",
                "keyFingerprint": runtime.cipher.fingerprint(),
                "logLevel": runtime.log_level,
            }))
        }
        _ => {
            print_usage();
            Ok(ExitCode::FAILURE)
        }
    }
}

fn directory_service() -> Result<DirectoryService<LdapGateway>, GatewayError> {
    let runtime = RuntimeConfig::from_raw(load_raw()?)?;
    let projector = DirectoryUserProjector::new(runtime.directory.attributes.clone());
    let gateway = LdapGateway::new(runtime.directory, runtime.credentials);
    info!(url = %gateway.settings().url, "directory gateway ready");
    Ok(DirectoryService::new(gateway, projector))
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage();
        return ExitCode::FAILURE;
    }

    match run(&args[1], &args[2..]) {
        Ok(code) => code,
        Err(err) if err.is_fatal() => {
            eprintln!("refusing to start: {err}");
            ExitCode::FAILURE
        }
        Err(err) if err.is_client_error() => {
            warn!("rejected input: {err}");
            ExitCode::FAILURE
        }
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}
