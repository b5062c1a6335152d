use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use anyhow::Context;
use grit_store::{
    hash_reader, LooseObjectStore, ObjectStore, StoreConfig, TreeBuilder, TreeEntry,
};
use grit_types::{ObjectId, ObjectType};
use tracing::debug;

use crate::cli::*;
use crate::repo::{self, GIT_DIR};
use crate::walk;

pub fn run_command(cli: Cli, out: &mut dyn Write) -> anyhow::Result<()> {
    let cwd = match cli.directory {
        Some(dir) => std::path::absolute(&dir)
            .with_context(|| format!("cannot resolve {}", dir.display()))?,
        None => std::env::current_dir().context("cannot determine the current directory")?,
    };
    match cli.command {
        Command::Init(args) => cmd_init(&cwd, args, out),
        Command::HashObject(args) => cmd_hash_object(&cwd, args, out),
        Command::CatFile(args) => cmd_cat_file(&cwd, args, out),
        Command::LsTree(args) => cmd_ls_tree(&cwd, args, out),
        Command::WriteTree => cmd_write_tree(&cwd, out),
    }
}

fn cmd_init(cwd: &Path, args: InitArgs, out: &mut dyn Write) -> anyhow::Result<()> {
    let target = args.path.map_or_else(|| cwd.to_path_buf(), |p| cwd.join(p));
    let git_dir = target.join(GIT_DIR);
    LooseObjectStore::init(&git_dir, StoreConfig::default())?;
    writeln!(out, "Initialized empty Git repository in {}", git_dir.display())?;
    Ok(())
}

fn cmd_hash_object(cwd: &Path, args: HashObjectArgs, out: &mut dyn Write) -> anyhow::Result<()> {
    let path = cwd.join(&args.file);
    let mut file = File::open(&path).with_context(|| format!("cannot open {}", path.display()))?;
    let size = file.metadata()?.len();

    let id = if args.write {
        let (_, store) = repo::open(cwd)?;
        store.write_stream(args.kind, size, &mut file)?
    } else {
        hash_reader(args.kind, size, file)?
    };
    debug!(%id, kind = %args.kind, size, stored = args.write, "hashed file");
    writeln!(out, "{id}")?;
    Ok(())
}

fn cmd_cat_file(cwd: &Path, args: CatFileArgs, out: &mut dyn Write) -> anyhow::Result<()> {
    let id = parse_id(&args.object)?;
    let (_, store) = repo::open(cwd)?;

    if args.kind {
        writeln!(out, "{}", store.read_header(&id)?.kind)?;
    } else if args.size {
        writeln!(out, "{}", store.read_header(&id)?.size)?;
    } else if store.read_header(&id)?.kind == ObjectType::Tree {
        for entry in store.tree_entries(&id)? {
            writeln!(out, "{}", entry_line(&entry?))?;
        }
    } else {
        let mut reader = store.open_object(&id)?;
        reader.header()?;
        io::copy(&mut reader, out).with_context(|| format!("reading object {id}"))?;
    }
    Ok(())
}

fn cmd_ls_tree(cwd: &Path, args: LsTreeArgs, out: &mut dyn Write) -> anyhow::Result<()> {
    let id = parse_id(&args.tree)?;
    let (_, store) = repo::open(cwd)?;
    for entry in store.tree_entries(&id)? {
        let entry = entry.with_context(|| format!("reading tree {id}"))?;
        if args.name_only {
            writeln!(out, "{}", entry.name)?;
        } else {
            writeln!(out, "{}", entry_line(&entry))?;
        }
    }
    Ok(())
}

fn cmd_write_tree(cwd: &Path, out: &mut dyn Write) -> anyhow::Result<()> {
    let (root, store) = repo::open(cwd)?;
    let mut builder = TreeBuilder::new(&store);
    for found in walk::work_tree_files(&root)? {
        let file = found
            .open()
            .with_context(|| format!("cannot read {}", found.full_path.display()))?;
        builder
            .add(file)
            .with_context(|| format!("cannot store {}", found.path))?;
    }
    let id = builder.finish()?;
    writeln!(out, "{id}")?;
    Ok(())
}

fn parse_id(text: &str) -> anyhow::Result<ObjectId> {
    text.parse()
        .with_context(|| format!("not a valid object name: {text}"))
}

fn entry_line(entry: &TreeEntry) -> String {
    format!(
        "{} {} {}\t{}",
        entry.mode,
        entry.mode.object_type(),
        entry.id,
        entry.name
    )
}
