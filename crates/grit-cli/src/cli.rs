use std::path::PathBuf;

use clap::{ArgGroup, Args, Parser, Subcommand};
use grit_types::ObjectType;

#[derive(Parser)]
#[command(
    name = "grit",
    about = "grit: a git-compatible content-addressable object store",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run as if started in PATH
    #[arg(short = 'C', global = true, value_name = "PATH")]
    pub directory: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create an empty repository
    Init(InitArgs),
    /// Compute an object id from a file and optionally store it
    HashObject(HashObjectArgs),
    /// Show the content, type or size of an object
    CatFile(CatFileArgs),
    /// List the entries of a tree object
    LsTree(LsTreeArgs),
    /// Store the working directory as tree objects
    WriteTree,
}

#[derive(Args)]
pub struct InitArgs {
    pub path: Option<PathBuf>,
}

#[derive(Args)]
pub struct HashObjectArgs {
    /// Write the object into the object database
    #[arg(short = 'w')]
    pub write: bool,
    #[arg(short = 't', value_name = "TYPE", default_value = "blob")]
    pub kind: ObjectType,
    pub file: PathBuf,
}

#[derive(Args)]
#[command(group(ArgGroup::new("mode").required(true).args(["pretty", "kind", "size"])))]
pub struct CatFileArgs {
    /// Pretty-print the object's content
    #[arg(short = 'p')]
    pub pretty: bool,
    /// Show the object's type
    #[arg(short = 't')]
    pub kind: bool,
    /// Show the object's size
    #[arg(short = 's')]
    pub size: bool,
    pub object: String,
}

#[derive(Args)]
pub struct LsTreeArgs {
    /// List only entry names
    #[arg(long)]
    pub name_only: bool,
    pub tree: String,
}
