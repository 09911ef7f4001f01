use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(
    name = "ledgerboard",
    about = "Ledgerboard: a kanban board whose every change lands on a hash-chained audit log",
    version
)]
pub struct Cli {
    /// Workspace directory holding the chain and entity snapshots
    #[arg(long, global = true, default_value = ".ledgerboard")]
    pub dir: String,

    /// Author recorded on new chain records (overrides config)
    #[arg(long, global = true)]
    pub author: Option<String>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the workspace directory, config and genesis chain
    Init,

    /// Project operations
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },

    /// Card operations
    Card {
        #[command(subcommand)]
        command: CardCommands,
    },

    /// Milestone operations
    Milestone {
        #[command(subcommand)]
        command: MilestoneCommands,
    },

    /// Inspect the audit chain
    Chain {
        #[command(subcommand)]
        command: ChainCommands,
    },
}

#[derive(Subcommand)]
pub enum ProjectCommands {
    /// Add a draft project
    Add {
        /// Project title
        title: String,

        /// Optional explicit project ID
        #[arg(long)]
        id: Option<String>,

        /// Owner (defaults to the author)
        #[arg(long)]
        owner: Option<String>,

        /// Project description
        #[arg(long, default_value = "")]
        description: String,
    },

    /// Update title or description
    Update {
        /// Project ID
        id: String,

        /// New title
        #[arg(long)]
        title: Option<String>,

        /// New description
        #[arg(long)]
        description: Option<String>,
    },

    /// Publish a draft project
    Publish {
        /// Project ID
        id: String,
    },

    /// Archive a published project
    Archive {
        /// Project ID
        id: String,
    },

    /// List projects
    List {
        /// Only projects owned by this id
        #[arg(long)]
        owner: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum CardCommands {
    /// Add a card at the end of a column
    Add {
        /// Project ID
        project_id: String,

        /// Card title
        title: String,

        /// Optional explicit card ID
        #[arg(long)]
        id: Option<String>,

        /// Column ID
        #[arg(long, default_value = "backlog")]
        column: String,

        /// Card description
        #[arg(long, default_value = "")]
        description: String,

        /// Assignee ID
        #[arg(long)]
        assignee: Option<String>,

        /// Parent card ID
        #[arg(long)]
        parent: Option<String>,
    },

    /// Move a card to the end of another column
    Move {
        /// Card ID
        id: String,

        /// Target column ID
        column: String,
    },

    /// Update card fields
    Update {
        /// Card ID
        id: String,

        /// New title
        #[arg(long)]
        title: Option<String>,

        /// New description
        #[arg(long)]
        description: Option<String>,

        /// New assignee
        #[arg(long, conflicts_with = "unassign")]
        assignee: Option<String>,

        /// Clear the assignee
        #[arg(long)]
        unassign: bool,
    },

    /// Delete a card without children
    Delete {
        /// Card ID
        id: String,
    },

    /// List cards of a project, or of one column in position order
    List {
        /// Project ID
        project_id: String,

        /// Column ID
        #[arg(long)]
        column: Option<String>,
    },

    /// Show every card below a card
    Tree {
        /// Root card ID
        id: String,
    },
}

#[derive(Subcommand)]
pub enum MilestoneCommands {
    /// Add a draft milestone
    Add {
        /// Project ID
        project_id: String,

        /// Milestone title
        title: String,

        /// Optional explicit milestone ID
        #[arg(long)]
        id: Option<String>,

        /// Payout in cents
        #[arg(long, default_value_t = 0)]
        amount_cents: u64,
    },

    /// Draft -> open
    Open { id: String },

    /// Open -> assigned
    Assign {
        id: String,

        /// Assignee ID
        assignee: String,
    },

    /// Assigned or rejected -> in progress
    Start { id: String },

    /// In progress -> submitted
    Submit { id: String },

    /// Submitted -> approved
    Approve { id: String },

    /// Submitted -> rejected
    Reject {
        id: String,

        /// Why the submission was rejected
        #[arg(long)]
        reason: String,
    },

    /// Approved or rejected -> completed
    Complete { id: String },

    /// Any non-terminal state -> cancelled
    Cancel { id: String },

    /// List milestones of a project
    List {
        /// Project ID
        project_id: String,

        /// Only milestones in this status
        #[arg(long)]
        status: Option<StatusArg>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum StatusArg {
    #[value(name = "draft")]
    Draft,
    #[value(name = "open")]
    Open,
    #[value(name = "assigned")]
    Assigned,
    #[value(name = "in-progress")]
    InProgress,
    #[value(name = "submitted")]
    Submitted,
    #[value(name = "approved")]
    Approved,
    #[value(name = "rejected")]
    Rejected,
    #[value(name = "completed")]
    Completed,
    #[value(name = "cancelled")]
    Cancelled,
}

#[derive(Subcommand)]
pub enum ChainCommands {
    /// All records for one subject
    History {
        /// Subject ID
        subject: String,
    },

    /// Check every hash and link
    Validate,

    /// Records up to a point in time
    Replay {
        /// Only records for this subject
        #[arg(long)]
        subject: Option<String>,

        /// RFC 3339 timestamp, inclusive
        #[arg(long)]
        until: Option<String>,
    },

    /// Record counts and latest timestamp
    Stats,

    /// A subject's entity as it stood at a point in time
    Show {
        /// Subject ID
        subject: String,

        /// RFC 3339 timestamp, inclusive (defaults to now)
        #[arg(long)]
        as_of: Option<String>,
    },
}
