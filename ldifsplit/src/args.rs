//! Command-line surface.
//!
//! Global arguments select the sources, the target base path and the split
//! base DN; one of four subcommands selects the split algorithm. Option
//! names mirror the directory server tooling conventions (camelCase long
//! names with kebab-case aliases).

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use ldifsplit_core::{Dn, Filter};

#[derive(Debug, Parser)]
#[command(
    name = "ldifsplit",
    version,
    about = "Splits LDIF data below a base DN into multiple sets, to help \
             initialize an entry-balancing directory proxy deployment"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: SplitCommand,
}

#[derive(Debug, Args)]
pub struct GlobalArgs {
    #[arg(
        short = 'l',
        long = "sourceLDIF",
        visible_alias = "source-ldif",
        alias = "inputLDIF",
        alias = "input-ldif",
        value_name = "FILE",
        help = "Path to an LDIF file to split. May be given multiple times; \
                standard input is read when omitted."
    )]
    pub source_ldif: Vec<PathBuf>,

    #[arg(
        short = 'C',
        long = "sourceCompressed",
        alias = "source-compressed",
        help = "The source LDIF data is gzip-compressed"
    )]
    pub source_compressed: bool,

    #[arg(
        short = 'o',
        long = "targetLDIFBasePath",
        visible_alias = "target-ldif-base-path",
        alias = "outputLDIFBasePath",
        alias = "output-ldif-base-path",
        value_name = "PATH",
        help = "Base path for the output set files; the set suffix is \
                appended. Defaults to the first source path. Required with \
                multiple sources or standard input."
    )]
    pub target_ldif_base_path: Option<PathBuf>,

    #[arg(
        short = 'c',
        long = "compressTarget",
        alias = "compress-target",
        alias = "compress",
        help = "gzip-compress the output set files"
    )]
    pub compress_target: bool,

    #[arg(
        short = 'b',
        long = "splitBaseDN",
        visible_alias = "split-base-dn",
        alias = "baseDN",
        alias = "base-dn",
        value_name = "DN",
        help = "The DN whose immediate children define the split"
    )]
    pub split_base_dn: Dn,

    #[arg(
        long = "addEntriesOutsideSplitBaseDNToAllSets",
        alias = "add-entries-outside-split-base-dn-to-all-sets",
        conflicts_with = "outside_to_dedicated_set",
        help = "Replicate entries at or above the split base DN into every set"
    )]
    pub outside_to_all_sets: bool,

    #[arg(
        long = "addEntriesOutsideSplitBaseDNToDedicatedSet",
        alias = "add-entries-outside-split-base-dn-to-dedicated-set",
        help = "Write entries at or above the split base DN to a dedicated set"
    )]
    pub outside_to_dedicated_set: bool,

    #[arg(
        long = "schemaPath",
        visible_alias = "schema-path",
        alias = "schemaFile",
        alias = "schemaDirectory",
        alias = "schema-file",
        alias = "schema-directory",
        value_name = "PATH",
        help = "Schema file or directory, used for filter matching rules. \
                May be given multiple times. Defaults to \
                $INSTANCE_ROOT/config/schema when unset."
    )]
    pub schema_path: Vec<PathBuf>,

    #[arg(
        short = 't',
        long = "numThreads",
        alias = "num-threads",
        value_name = "N",
        default_value_t = 1,
        value_parser = clap::value_parser!(u32).range(1..),
        help = "Number of parse/translate worker threads"
    )]
    pub num_threads: u32,
}

#[derive(Debug, Subcommand)]
pub enum SplitCommand {
    /// Choose the set by hashing the RDN immediately below the split base
    /// DN. Needs no parent cache and runs in constant memory.
    #[command(name = "split-using-hash-on-rdn", visible_alias = "hash-on-rdn")]
    HashOnRdn(HashOnRdnArgs),

    /// Choose the set by hashing the value(s) of a named attribute of each
    /// entry immediately below the split base DN.
    #[command(
        name = "split-using-hash-on-attribute",
        visible_alias = "hash-on-attribute"
    )]
    HashOnAttribute(HashOnAttributeArgs),

    /// Place each entry immediately below the split base DN into the set
    /// that currently holds the fewest entries.
    #[command(
        name = "split-using-fewest-entries",
        visible_alias = "fewest-entries"
    )]
    FewestEntries(FewestEntriesArgs),

    /// Choose the set with an ordered list of search filters; the first
    /// matching filter wins.
    #[command(name = "split-using-filter", visible_alias = "filter")]
    Filter(FilterArgs),
}

#[derive(Debug, Args)]
#[command(after_help = HASH_ON_RDN_EXAMPLE)]
pub struct HashOnRdnArgs {
    #[arg(
        long = "numSets",
        alias = "num-sets",
        value_name = "N",
        value_parser = clap::value_parser!(u32).range(2..),
        help = "Number of sets to split the data into"
    )]
    pub num_sets: u32,
}

#[derive(Debug, Args)]
#[command(after_help = HASH_ON_ATTRIBUTE_EXAMPLE)]
pub struct HashOnAttributeArgs {
    #[arg(
        long = "attributeName",
        alias = "attribute-name",
        value_name = "ATTR",
        help = "Attribute whose value(s) are hashed"
    )]
    pub attribute_name: String,

    #[arg(
        long = "numSets",
        alias = "num-sets",
        value_name = "N",
        value_parser = clap::value_parser!(u32).range(2..),
        help = "Number of sets to split the data into"
    )]
    pub num_sets: u32,

    #[arg(
        long = "useAllValues",
        alias = "use-all-values",
        help = "Hash all values of the attribute rather than only the first"
    )]
    pub use_all_values: bool,

    #[arg(
        long = "assumeFlatDIT",
        alias = "assume-flat-dit",
        help = "Assume all entries are exactly one level below the split \
                base DN; skips the parent cache"
    )]
    pub assume_flat_dit: bool,
}

#[derive(Debug, Args)]
#[command(after_help = FEWEST_ENTRIES_EXAMPLE)]
pub struct FewestEntriesArgs {
    #[arg(
        long = "numSets",
        alias = "num-sets",
        value_name = "N",
        value_parser = clap::value_parser!(u32).range(2..),
        help = "Number of sets to split the data into"
    )]
    pub num_sets: u32,

    #[arg(
        long = "assumeFlatDIT",
        alias = "assume-flat-dit",
        help = "Assume all entries are exactly one level below the split \
                base DN; skips the parent cache. Entries found deeper than \
                one level are sent to the errors set."
    )]
    pub assume_flat_dit: bool,
}

#[derive(Debug, Args)]
#[command(after_help = FILTER_EXAMPLE)]
pub struct FilterArgs {
    #[arg(
        long = "filter",
        value_name = "FILTER",
        required = true,
        help = "Search filter selecting one set. Must be given at least \
                twice; the first matching filter wins, and entries matching \
                none fall back to an RDN hash."
    )]
    pub filter: Vec<Filter>,

    #[arg(
        long = "assumeFlatDIT",
        alias = "assume-flat-dit",
        help = "Assume all entries are exactly one level below the split \
                base DN; skips the parent cache"
    )]
    pub assume_flat_dit: bool,
}

const HASH_ON_RDN_EXAMPLE: &str = "\
EXAMPLE:
    ldifsplit --sourceLDIF whole.ldif \\
        --targetLDIFBasePath split.ldif \\
        --splitBaseDN ou=People,dc=example,dc=com \\
        --addEntriesOutsideSplitBaseDNToAllSets \\
        split-using-hash-on-rdn --numSets 4
";

const HASH_ON_ATTRIBUTE_EXAMPLE: &str = "\
EXAMPLE:
    ldifsplit --sourceLDIF whole.ldif \\
        --targetLDIFBasePath split.ldif \\
        --splitBaseDN ou=People,dc=example,dc=com \\
        --addEntriesOutsideSplitBaseDNToAllSets \\
        split-using-hash-on-attribute --attributeName uid --numSets 4
";

const FEWEST_ENTRIES_EXAMPLE: &str = "\
EXAMPLE:
    ldifsplit --sourceLDIF whole.ldif \\
        --targetLDIFBasePath split.ldif \\
        --splitBaseDN ou=People,dc=example,dc=com \\
        --addEntriesOutsideSplitBaseDNToAllSets \\
        split-using-fewest-entries --numSets 4
";

const FILTER_EXAMPLE: &str = "\
EXAMPLE:
    ldifsplit --sourceLDIF whole.ldif \\
        --targetLDIFBasePath split.ldif \\
        --splitBaseDN ou=People,dc=example,dc=com \\
        --addEntriesOutsideSplitBaseDNToAllSets \\
        split-using-filter \\
        --filter '(timeZone=Eastern)' --filter '(timeZone=Central)' \\
        --filter '(timeZone=Mountain)' --filter '(timeZone=Pacific)'
";
