use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "explain")]
#[command(about = "Explain why a system call failed")]
pub struct Cli {
    /// Print results as JSON.
    #[arg(long, global = true)]
    pub json: bool,

    /// More log output on stderr (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Options applied after those in EXPLAIN_OPTIONS, same syntax.
    ///
    /// Example: --options "no-numeric-errno,dialect=bsd"
    #[arg(short = 'o', long = "options", global = true)]
    pub options: Option<String>,

    #[command(subcommand)]
    pub cmd: Cmd,
}

#[derive(Subcommand)]
pub enum Cmd {
    /// Explain a failed call, as if this process had just made it.
    ///
    /// Usage:
    ///   explain call -e ENOENT open /no/such/file O_RDONLY
    ///   explain call -e EAI_NONAME getaddrinfo NULL NULL
    Call {
        /// The error the call failed with, by name or number.
        #[arg(short = 'e', long = "errno")]
        errno: String,

        /// The call, one of `explain list`.
        syscall: String,

        /// The call's arguments. Flags are written `A|B`, missing
        /// pointers as NULL, descriptors as numbers or AT_FDCWD.
        #[arg(allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Look up an error code by name or number.
    Errno {
        /// `ENOENT`, `2`, `EAI_AGAIN`, ...
        code: String,
    },

    /// List the calls that can be explained.
    List,

    /// Check the built-in ioctl table for ambiguous or malformed entries.
    CheckIoctlTable,
}
