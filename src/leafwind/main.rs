use clap::Parser;
use directories::ProjectDirs;
use leafwind::api::LeafwindApi;
use leafwind::commands::config::ConfigAction;
use leafwind::commands::convert::parse_blob_meta;
use leafwind::commands::export::default_archive_name;
use leafwind::commands::publish::DirPublisher;
use leafwind::commands::{LeafletBundle, PublicationSettings};
use leafwind::config::{CONFIG_FILENAME, KEYS};
use leafwind::error::{LeafwindError, Result};
use leafwind::model::BlobMeta;
use leafwind::probe::fs::LocalBlobProbe;
use serde_json::json;
use std::io::Read;
use std::path::{Path, PathBuf};

mod args;
mod print;
use args::{Cli, Commands};
use print::{eprint_messages, print_blocks, print_messages};

type Api = LeafwindApi<LocalBlobProbe>;

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = match cli.config {
        Some(path) => path,
        None => default_config_path()?,
    };
    let api = Api::open(config_path)?;

    match cli.command {
        Commands::Convert {
            input,
            name,
            did,
            base_path,
            description,
            show_in_discover,
            show_comments,
            primary,
            background,
            page_background,
            show_page_background,
            blobs,
            blob_dir,
            out_dir,
            archive,
            json,
        } => {
            let settings = PublicationSettings {
                name,
                author_did: did,
                base_path,
                description,
                show_in_discover,
                show_comments,
                primary_color: primary,
                background_color: background,
                page_background,
                show_page_background,
            };
            let outputs = Outputs {
                out_dir,
                archive,
                json,
            };
            handle_convert(with_blob_dir(api, blob_dir), &input, &settings, blobs, outputs)
        }
        Commands::Parse {
            input,
            did,
            blobs,
            blob_dir,
            json,
        } => handle_parse(with_blob_dir(api, blob_dir), &input, &did, blobs, json),
        Commands::Tid { count, inspect } => handle_tid(&api, count, inspect),
        Commands::Config { key, value } => handle_config(api, key, value),
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

fn default_config_path() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("com", "leafwind", "leafwind")
        .ok_or_else(|| LeafwindError::Config("could not determine config dir".into()))?;
    Ok(dirs.config_dir().join(CONFIG_FILENAME))
}

fn with_blob_dir(api: Api, blob_dir: Option<PathBuf>) -> Api {
    match blob_dir {
        Some(dir) => api.with_probe(LocalBlobProbe::new(dir)),
        None => api,
    }
}

/// Read a file, or stdin when the path is `-`.
fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        return Ok(buf);
    }
    Ok(std::fs::read_to_string(path)?)
}

fn load_blobs(path: Option<&Path>) -> Result<Vec<BlobMeta>> {
    match path {
        Some(path) => parse_blob_meta(&read_input(path)?),
        None => Ok(Vec::new()),
    }
}

struct Outputs {
    out_dir: Option<PathBuf>,
    archive: Option<PathBuf>,
    json: bool,
}

fn handle_convert(
    api: Api,
    input: &Path,
    settings: &PublicationSettings,
    blobs: Option<PathBuf>,
    outputs: Outputs,
) -> Result<()> {
    let entries_json = read_input(input)?;
    let blobs = load_blobs(blobs.as_deref())?;
    let result = api.convert(&entries_json, settings, blobs)?;
    let bundle = result
        .bundle
        .as_ref()
        .ok_or_else(|| LeafwindError::InvalidInput("conversion produced no records".into()))?;

    if outputs.json {
        eprint_messages(&result.messages);
        println!("{}", serde_json::to_string_pretty(&bundle_json(bundle))?);
    } else {
        print_messages(&result.messages);
        if let Some(dir) = &outputs.out_dir {
            let mut publisher = DirPublisher::new(dir, &settings.author_did);
            print_messages(&api.publish(&mut publisher, bundle)?.messages);
        }
        if outputs.archive.is_some() || outputs.out_dir.is_none() {
            let dest = outputs.archive.unwrap_or_else(default_archive_name);
            print_messages(&api.export(bundle, &dest)?.messages);
        }
    }

    if bundle.documents.is_empty() && !bundle.failures.is_empty() {
        return Err(LeafwindError::InvalidInput(
            "none of the entries could be converted".into(),
        ));
    }
    Ok(())
}

fn bundle_json(bundle: &LeafletBundle) -> serde_json::Value {
    let documents: Vec<_> = bundle
        .documents
        .iter()
        .map(|doc| {
            json!({
                "rkey": doc.rkey,
                "source": doc.source_uri,
                "record": doc.record,
            })
        })
        .collect();
    let failures: Vec<_> = bundle
        .failures
        .iter()
        .map(|f| json!({ "index": f.index, "source": f.source_uri, "reason": f.reason }))
        .collect();

    json!({
        "publication": {
            "rkey": bundle.publication_rkey,
            "uri": bundle.publication_uri(),
            "record": bundle.publication,
        },
        "documents": documents,
        "failures": failures,
    })
}

fn handle_parse(
    api: Api,
    input: &Path,
    did: &str,
    blobs: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let markdown = read_input(input)?;
    let blobs = load_blobs(blobs.as_deref())?;
    let result = api.parse(&markdown, did, blobs)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result.blocks)?);
    } else {
        print_blocks(&result.blocks);
        print_messages(&result.messages);
    }
    Ok(())
}

fn handle_tid(api: &Api, count: usize, inspect: Option<String>) -> Result<()> {
    if let Some(tid) = inspect {
        print_messages(&api.inspect_tid(&tid)?.messages);
        return Ok(());
    }

    for tid in api.generate_tids(count)?.tids {
        println!("{}", tid);
    }
    Ok(())
}

fn handle_config(mut api: Api, key: Option<String>, value: Option<String>) -> Result<()> {
    let action = match (key, value) {
        (None, _) => ConfigAction::List,
        (Some(k), None) => ConfigAction::Get(k),
        (Some(key), Some(value)) => ConfigAction::Set { key, value },
    };
    let show_all = matches!(action, ConfigAction::List);

    let result = api.config_action(action)?;
    if show_all {
        if let Some(config) = &result.config {
            for key in KEYS {
                println!("{} = {}", key, config.get(key).unwrap_or_default());
            }
        }
    }
    print_messages(&result.messages);
    if result.has_errors() {
        std::process::exit(1);
    }
    Ok(())
}
