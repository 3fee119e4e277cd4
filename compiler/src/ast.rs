// ast.rs — AST node types for CIL policy statements
//
// One closed sum type (`Stmt`) covers every statement kind the resolver
// understands; the flavor tag is derived from the variant, so a node's
// flavor and payload can never disagree. Name references start as interned
// `Sym` strings and gain an `Option<DatumId>` binding as the passes run.
//
// Preconditions: nodes are structurally complete when handed to the
//                resolver (every statement's syntactic children present).
// Postconditions: none (data-only module).
// Failure modes: none.
// Side effects: none.

use serde::Serialize;

use crate::id::{DatumId, NodeId, ScopeId};
use crate::strpool::Sym;

/// Byte-offset span in the original module source, carried opaquely from
/// the AST builder for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }
}

// ── Tree node ───────────────────────────────────────────────────────────────

/// A node in the statement tree. Children and parent are arena indices.
#[derive(Debug, Clone)]
pub struct AstNode {
    pub stmt: Stmt,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Present only on scoping nodes (root, block, macro, in, condblock,
    /// and call sites after expansion).
    pub scope: Option<ScopeId>,
    pub span: Span,
}

// ── Expressions ─────────────────────────────────────────────────────────────

/// Boolean / set / constraint operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprOp {
    Not,
    And,
    Or,
    Xor,
    Eq,
    Neq,
    /// MLS dominance (constraints only).
    Dom,
    DomBy,
    Incomp,
    /// Category range `(range lo hi)` (category expressions only).
    Range,
}

impl ExprOp {
    pub fn arity(self) -> usize {
        match self {
            ExprOp::Not => 1,
            _ => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ExprOp::Not => "not",
            ExprOp::And => "and",
            ExprOp::Or => "or",
            ExprOp::Xor => "xor",
            ExprOp::Eq => "eq",
            ExprOp::Neq => "neq",
            ExprOp::Dom => "dom",
            ExprOp::DomBy => "domby",
            ExprOp::Incomp => "incomp",
            ExprOp::Range => "range",
        }
    }
}

/// The fixed context-attribute operands of constrain/validatetrans
/// expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsSelector {
    U1,
    U2,
    U3,
    R1,
    R2,
    R3,
    T1,
    T2,
    T3,
    L1,
    L2,
    H1,
    H2,
}

/// One item of an unresolved postfix expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprToken {
    Name(Sym),
    Op(ExprOp),
    Selector(ConsSelector),
}

/// One item of a resolved postfix expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprItem {
    Datum(DatumId),
    Op(ExprOp),
    Selector(ConsSelector),
}

/// A resolved postfix expression stack.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExprStack(pub Vec<ExprItem>);

// ── Shared reference shapes ─────────────────────────────────────────────────

/// An inline (anonymous) level: sensitivity plus optional category
/// expression.
#[derive(Debug, Clone)]
pub struct LevelSpec {
    pub sens: Sym,
    pub sens_datum: Option<DatumId>,
    pub cats: Option<Vec<ExprToken>>,
    /// Expanded category membership, filled by the MLS pass.
    pub cat_datums: Vec<DatumId>,
}

impl LevelSpec {
    pub fn new(sens: Sym, cats: Option<Vec<ExprToken>>) -> Self {
        LevelSpec {
            sens,
            sens_datum: None,
            cats,
            cat_datums: Vec::new(),
        }
    }
}

/// A level position: either a reference to a named level or an inline one.
#[derive(Debug, Clone)]
pub enum LevelRef {
    Named(Sym, Option<DatumId>),
    Anon(LevelSpec),
}

impl LevelRef {
    pub fn named(sym: Sym) -> Self {
        LevelRef::Named(sym, None)
    }
}

/// An inline level range.
#[derive(Debug, Clone)]
pub struct LevelRangeSpec {
    pub low: LevelRef,
    pub high: LevelRef,
}

/// A level-range position: named reference or inline.
#[derive(Debug, Clone)]
pub enum LevelRangeRef {
    Named(Sym, Option<DatumId>),
    Anon(LevelRangeSpec),
}

impl LevelRangeRef {
    pub fn named(sym: Sym) -> Self {
        LevelRangeRef::Named(sym, None)
    }

    pub fn anon(low: LevelRef, high: LevelRef) -> Self {
        LevelRangeRef::Anon(LevelRangeSpec { low, high })
    }
}

/// An inline security context (user role type range).
#[derive(Debug, Clone)]
pub struct ContextSpec {
    pub user: Sym,
    pub user_datum: Option<DatumId>,
    pub role: Sym,
    pub role_datum: Option<DatumId>,
    pub type_: Sym,
    pub type_datum: Option<DatumId>,
    pub range: LevelRangeRef,
}

impl ContextSpec {
    pub fn new(user: Sym, role: Sym, type_: Sym, range: LevelRangeRef) -> Self {
        ContextSpec {
            user,
            user_datum: None,
            role,
            role_datum: None,
            type_,
            type_datum: None,
            range,
        }
    }
}

/// A context position: named reference or inline.
#[derive(Debug, Clone)]
pub enum ContextRef {
    Named(Sym, Option<DatumId>),
    Anon(ContextSpec),
}

impl ContextRef {
    pub fn named(sym: Sym) -> Self {
        ContextRef::Named(sym, None)
    }
}

/// One class/permission group of an access-vector rule: either an inline
/// `(class (perm ...))` pair or a named classpermission set.
#[derive(Debug, Clone)]
pub enum ClassPerms {
    Perms {
        class: Sym,
        class_datum: Option<DatumId>,
        perms: Vec<Sym>,
        perm_datums: Vec<DatumId>,
    },
    Named {
        set: Sym,
        datum: Option<DatumId>,
    },
}

impl ClassPerms {
    pub fn perms(class: Sym, perms: Vec<Sym>) -> Self {
        ClassPerms::Perms {
            class,
            class_datum: None,
            perms,
            perm_datums: Vec::new(),
        }
    }
}

// ── Macro calls ─────────────────────────────────────────────────────────────

/// Expected kind of one macro parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Type,
    Role,
    User,
    Sens,
    Cat,
    CatSet,
    Level,
    LevelRange,
    Class,
    ClassPermission,
    Bool,
    IpAddr,
}

/// A macro parameter: expected kind plus name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Param {
    pub kind: ParamKind,
    pub name: Sym,
}

/// The syntactic value of one call argument.
#[derive(Debug, Clone)]
pub enum ArgValue {
    Name(Sym),
    AnonLevel(LevelSpec),
    AnonLevelRange(LevelRangeSpec),
    AnonCatSet(Vec<ExprToken>),
}

/// A call argument plus its binding once Call2 has run.
#[derive(Debug, Clone)]
pub struct CallArg {
    pub value: ArgValue,
    pub datum: Option<DatumId>,
}

impl CallArg {
    pub fn name(sym: Sym) -> Self {
        CallArg {
            value: ArgValue::Name(sym),
            datum: None,
        }
    }
}

// ── Rule payload enums ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvRuleKind {
    Allow,
    AuditAllow,
    DontAudit,
    NeverAllow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeRuleKind {
    Transition,
    Member,
    Change,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundsKind {
    Type,
    Role,
    User,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDomain {
    Class,
    Category,
    Sensitivity,
    Sid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Proto {
    Tcp,
    Udp,
    Dccp,
    Sctp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsUseKind {
    Xattr,
    Task,
    Trans,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileConKind {
    File,
    Dir,
    Char,
    Block,
    Socket,
    Pipe,
    SymLink,
    Any,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultKind {
    User,
    Role,
    Type,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultObject {
    Source,
    Target,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultRangePos {
    Low,
    High,
    LowHigh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleUnknownAction {
    Allow,
    Deny,
    Reject,
}

/// Node address operand of a `nodecon`: named ipaddr or literal text.
#[derive(Debug, Clone)]
pub enum IpSpec {
    Named(Sym, Option<DatumId>),
    Literal(Sym, Option<std::net::IpAddr>),
}

// ── Statements ──────────────────────────────────────────────────────────────

/// A plain named declaration (`(type foo)` and friends).
#[derive(Debug, Clone)]
pub struct Decl {
    pub name: Sym,
    pub datum: Option<DatumId>,
}

impl Decl {
    pub fn new(name: Sym) -> Self {
        Decl { name, datum: None }
    }
}

/// Every statement kind the resolver understands.
#[derive(Debug, Clone)]
pub enum Stmt {
    Root,

    // ── containers ──
    Block(Decl),
    BlockInherit {
        block: Sym,
        resolved: Option<DatumId>,
    },
    In {
        is_after: bool,
        container: Sym,
        resolved: Option<DatumId>,
    },
    Optional(Decl),
    Macro {
        name: Sym,
        datum: Option<DatumId>,
        params: Vec<Param>,
    },
    Call {
        macro_name: Sym,
        macro_datum: Option<DatumId>,
        args: Vec<CallArg>,
        copied: bool,
    },
    TunableIf {
        expr: Vec<ExprToken>,
        resolved: Option<ExprStack>,
    },
    BooleanIf {
        expr: Vec<ExprToken>,
        resolved: Option<ExprStack>,
    },
    CondBlock {
        branch: bool,
        live: bool,
    },

    // ── declarations ──
    TypeDecl(Decl),
    TypeAttr(Decl),
    RoleDecl(Decl),
    RoleAttr(Decl),
    UserDecl(Decl),
    BoolDecl {
        name: Sym,
        value: bool,
        datum: Option<DatumId>,
    },
    TunableDecl {
        name: Sym,
        value: bool,
        datum: Option<DatumId>,
    },
    ClassDecl {
        name: Sym,
        perms: Vec<Sym>,
        datum: Option<DatumId>,
    },
    CommonDecl {
        name: Sym,
        perms: Vec<Sym>,
        datum: Option<DatumId>,
    },
    ClassPermissionDecl(Decl),
    SidDecl(Decl),
    SensDecl(Decl),
    CatDecl(Decl),
    CatSetDecl {
        name: Sym,
        expr: Vec<ExprToken>,
        datum: Option<DatumId>,
    },
    LevelDecl {
        name: Sym,
        level: LevelSpec,
        datum: Option<DatumId>,
    },
    LevelRangeDecl {
        name: Sym,
        range: LevelRangeSpec,
        datum: Option<DatumId>,
    },
    ContextDecl {
        name: Sym,
        context: ContextSpec,
        datum: Option<DatumId>,
    },
    IpAddrDecl {
        name: Sym,
        addr: Sym,
        parsed: Option<std::net::IpAddr>,
        datum: Option<DatumId>,
    },
    PolicyCapDecl(Decl),

    // ── orders (Misc1) ──
    Order {
        domain: OrderDomain,
        names: Vec<Sym>,
    },

    // ── class shape (Misc2) ──
    ClassCommon {
        class: Sym,
        class_datum: Option<DatumId>,
        common: Sym,
        common_datum: Option<DatumId>,
    },
    ClassPermissionSet {
        set: Sym,
        set_datum: Option<DatumId>,
        classperms: Vec<ClassPerms>,
    },

    // ── MLS ──
    SensCat {
        sens: Sym,
        sens_datum: Option<DatumId>,
        cats: Vec<ExprToken>,
        cat_datums: Vec<DatumId>,
    },

    // ── attribute sets (Misc3) ──
    TypeAttrSet {
        attr: Sym,
        attr_datum: Option<DatumId>,
        expr: Vec<ExprToken>,
        resolved: Option<ExprStack>,
    },
    RoleAttrSet {
        attr: Sym,
        attr_datum: Option<DatumId>,
        expr: Vec<ExprToken>,
        resolved: Option<ExprStack>,
    },
    TypePermissive {
        type_: Sym,
        type_datum: Option<DatumId>,
    },

    // ── rules (Misc3) ──
    AvRule {
        kind: AvRuleKind,
        src: Sym,
        src_datum: Option<DatumId>,
        tgt: Sym,
        tgt_datum: Option<DatumId>,
        classperms: Vec<ClassPerms>,
    },
    TypeRule {
        kind: TypeRuleKind,
        src: Sym,
        src_datum: Option<DatumId>,
        tgt: Sym,
        tgt_datum: Option<DatumId>,
        class: Sym,
        class_datum: Option<DatumId>,
        result: Sym,
        result_datum: Option<DatumId>,
    },
    NameTypeTransition {
        src: Sym,
        src_datum: Option<DatumId>,
        tgt: Sym,
        tgt_datum: Option<DatumId>,
        class: Sym,
        class_datum: Option<DatumId>,
        object_name: Sym,
        result: Sym,
        result_datum: Option<DatumId>,
    },
    RangeTransition {
        src: Sym,
        src_datum: Option<DatumId>,
        exec: Sym,
        exec_datum: Option<DatumId>,
        class: Sym,
        class_datum: Option<DatumId>,
        range: LevelRangeRef,
    },
    RoleType {
        role: Sym,
        role_datum: Option<DatumId>,
        type_: Sym,
        type_datum: Option<DatumId>,
    },
    RoleAllow {
        src: Sym,
        src_datum: Option<DatumId>,
        tgt: Sym,
        tgt_datum: Option<DatumId>,
    },
    RoleTransition {
        src: Sym,
        src_datum: Option<DatumId>,
        tgt: Sym,
        tgt_datum: Option<DatumId>,
        class: Sym,
        class_datum: Option<DatumId>,
        result: Sym,
        result_datum: Option<DatumId>,
    },
    Bounds {
        kind: BoundsKind,
        parent: Sym,
        parent_datum: Option<DatumId>,
        child: Sym,
        child_datum: Option<DatumId>,
    },

    // ── users (Misc3) ──
    UserRole {
        user: Sym,
        user_datum: Option<DatumId>,
        role: Sym,
        role_datum: Option<DatumId>,
    },
    UserLevel {
        user: Sym,
        user_datum: Option<DatumId>,
        level: LevelRef,
    },
    UserRange {
        user: Sym,
        user_datum: Option<DatumId>,
        range: LevelRangeRef,
    },
    UserPrefix {
        user: Sym,
        user_datum: Option<DatumId>,
        prefix: Sym,
    },
    SelinuxUser {
        /// Seuser name; for `selinuxuserdefault` this is the fixed
        /// `__default__` name.
        name: Sym,
        is_default: bool,
        user: Sym,
        user_datum: Option<DatumId>,
        range: LevelRangeRef,
    },

    // ── constraints (Misc3) ──
    Constrain {
        mls: bool,
        classperms: Vec<ClassPerms>,
        expr: Vec<ExprToken>,
        resolved: Option<ExprStack>,
    },
    ValidateTrans {
        mls: bool,
        class: Sym,
        class_datum: Option<DatumId>,
        expr: Vec<ExprToken>,
        resolved: Option<ExprStack>,
    },

    // ── labeling contexts (Misc3) ──
    SidContext {
        sid: Sym,
        sid_datum: Option<DatumId>,
        context: ContextRef,
    },
    FileCon {
        path: Sym,
        kind: FileConKind,
        context: Option<ContextRef>,
    },
    PortCon {
        proto: Proto,
        low: u32,
        high: u32,
        context: ContextRef,
    },
    NodeCon {
        addr: IpSpec,
        mask: IpSpec,
        context: ContextRef,
    },
    GenfsCon {
        fs: Sym,
        path: Sym,
        context: ContextRef,
    },
    NetifCon {
        interface: Sym,
        if_context: ContextRef,
        packet_context: ContextRef,
    },
    FsUse {
        kind: FsUseKind,
        fs: Sym,
        context: ContextRef,
    },
    PirqCon {
        pirq: u32,
        context: ContextRef,
    },
    IomemCon {
        low: u64,
        high: u64,
        context: ContextRef,
    },
    IoportCon {
        low: u32,
        high: u32,
        context: ContextRef,
    },
    PciDeviceCon {
        device: u32,
        context: ContextRef,
    },
    DeviceTreeCon {
        path: Sym,
        context: ContextRef,
    },
    IbPkeyCon {
        subnet: Sym,
        low: u32,
        high: u32,
        context: ContextRef,
    },
    IbEndPortCon {
        device: Sym,
        port: u32,
        context: ContextRef,
    },

    // ── policy-wide settings (Misc3) ──
    Default {
        kind: DefaultKind,
        classes: Vec<Sym>,
        class_datums: Vec<DatumId>,
        object: DefaultObject,
    },
    DefaultRange {
        classes: Vec<Sym>,
        class_datums: Vec<DatumId>,
        object: DefaultObject,
        pos: DefaultRangePos,
    },
    HandleUnknown {
        action: HandleUnknownAction,
    },
    MlsFlag {
        value: bool,
    },
}

// ── Flavor ──────────────────────────────────────────────────────────────────

/// Statement-kind tag, derived from the `Stmt` variant. Used for
/// diagnostics and for the structural placement guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flavor {
    Root,
    Block,
    BlockInherit,
    In,
    Optional,
    Macro,
    Call,
    TunableIf,
    BooleanIf,
    CondBlock,
    Type,
    TypeAttr,
    Role,
    RoleAttr,
    User,
    Bool,
    Tunable,
    Class,
    Common,
    ClassPermission,
    Sid,
    Sens,
    Cat,
    CatSet,
    Level,
    LevelRange,
    Context,
    IpAddr,
    PolicyCap,
    ClassOrder,
    CategoryOrder,
    SensitivityOrder,
    SidOrder,
    ClassCommon,
    ClassPermissionSet,
    SensCat,
    TypeAttrSet,
    RoleAttrSet,
    TypePermissive,
    AvRule,
    TypeRule,
    NameTypeTransition,
    RangeTransition,
    RoleType,
    RoleAllow,
    RoleTransition,
    Bounds,
    UserRole,
    UserLevel,
    UserRange,
    UserPrefix,
    SelinuxUser,
    Constrain,
    ValidateTrans,
    SidContext,
    FileCon,
    PortCon,
    NodeCon,
    GenfsCon,
    NetifCon,
    FsUse,
    PirqCon,
    IomemCon,
    IoportCon,
    PciDeviceCon,
    DeviceTreeCon,
    IbPkeyCon,
    IbEndPortCon,
    Default,
    DefaultRange,
    HandleUnknown,
    MlsFlag,
}

impl Flavor {
    /// Statement keyword for diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            Flavor::Root => "root",
            Flavor::Block => "block",
            Flavor::BlockInherit => "blockinherit",
            Flavor::In => "in",
            Flavor::Optional => "optional",
            Flavor::Macro => "macro",
            Flavor::Call => "call",
            Flavor::TunableIf => "tunableif",
            Flavor::BooleanIf => "booleanif",
            Flavor::CondBlock => "condblock",
            Flavor::Type => "type",
            Flavor::TypeAttr => "typeattribute",
            Flavor::Role => "role",
            Flavor::RoleAttr => "roleattribute",
            Flavor::User => "user",
            Flavor::Bool => "boolean",
            Flavor::Tunable => "tunable",
            Flavor::Class => "class",
            Flavor::Common => "common",
            Flavor::ClassPermission => "classpermission",
            Flavor::Sid => "sid",
            Flavor::Sens => "sensitivity",
            Flavor::Cat => "category",
            Flavor::CatSet => "categoryset",
            Flavor::Level => "level",
            Flavor::LevelRange => "levelrange",
            Flavor::Context => "context",
            Flavor::IpAddr => "ipaddr",
            Flavor::PolicyCap => "policycap",
            Flavor::ClassOrder => "classorder",
            Flavor::CategoryOrder => "categoryorder",
            Flavor::SensitivityOrder => "sensitivityorder",
            Flavor::SidOrder => "sidorder",
            Flavor::ClassCommon => "classcommon",
            Flavor::ClassPermissionSet => "classpermissionset",
            Flavor::SensCat => "sensitivitycategory",
            Flavor::TypeAttrSet => "typeattributeset",
            Flavor::RoleAttrSet => "roleattributeset",
            Flavor::TypePermissive => "typepermissive",
            Flavor::AvRule => "avrule",
            Flavor::TypeRule => "typerule",
            Flavor::NameTypeTransition => "typetransition",
            Flavor::RangeTransition => "rangetransition",
            Flavor::RoleType => "roletype",
            Flavor::RoleAllow => "roleallow",
            Flavor::RoleTransition => "roletransition",
            Flavor::Bounds => "bounds",
            Flavor::UserRole => "userrole",
            Flavor::UserLevel => "userlevel",
            Flavor::UserRange => "userrange",
            Flavor::UserPrefix => "userprefix",
            Flavor::SelinuxUser => "selinuxuser",
            Flavor::Constrain => "constrain",
            Flavor::ValidateTrans => "validatetrans",
            Flavor::SidContext => "sidcontext",
            Flavor::FileCon => "filecon",
            Flavor::PortCon => "portcon",
            Flavor::NodeCon => "nodecon",
            Flavor::GenfsCon => "genfscon",
            Flavor::NetifCon => "netifcon",
            Flavor::FsUse => "fsuse",
            Flavor::PirqCon => "pirqcon",
            Flavor::IomemCon => "iomemcon",
            Flavor::IoportCon => "ioportcon",
            Flavor::PciDeviceCon => "pcidevicecon",
            Flavor::DeviceTreeCon => "devicetreecon",
            Flavor::IbPkeyCon => "ibpkeycon",
            Flavor::IbEndPortCon => "ibendportcon",
            Flavor::Default => "default",
            Flavor::DefaultRange => "defaultrange",
            Flavor::HandleUnknown => "handleunknown",
            Flavor::MlsFlag => "mls",
        }
    }
}

impl Stmt {
    pub fn flavor(&self) -> Flavor {
        match self {
            Stmt::Root => Flavor::Root,
            Stmt::Block(_) => Flavor::Block,
            Stmt::BlockInherit { .. } => Flavor::BlockInherit,
            Stmt::In { .. } => Flavor::In,
            Stmt::Optional(_) => Flavor::Optional,
            Stmt::Macro { .. } => Flavor::Macro,
            Stmt::Call { .. } => Flavor::Call,
            Stmt::TunableIf { .. } => Flavor::TunableIf,
            Stmt::BooleanIf { .. } => Flavor::BooleanIf,
            Stmt::CondBlock { .. } => Flavor::CondBlock,
            Stmt::TypeDecl(_) => Flavor::Type,
            Stmt::TypeAttr(_) => Flavor::TypeAttr,
            Stmt::RoleDecl(_) => Flavor::Role,
            Stmt::RoleAttr(_) => Flavor::RoleAttr,
            Stmt::UserDecl(_) => Flavor::User,
            Stmt::BoolDecl { .. } => Flavor::Bool,
            Stmt::TunableDecl { .. } => Flavor::Tunable,
            Stmt::ClassDecl { .. } => Flavor::Class,
            Stmt::CommonDecl { .. } => Flavor::Common,
            Stmt::ClassPermissionDecl(_) => Flavor::ClassPermission,
            Stmt::SidDecl(_) => Flavor::Sid,
            Stmt::SensDecl(_) => Flavor::Sens,
            Stmt::CatDecl(_) => Flavor::Cat,
            Stmt::CatSetDecl { .. } => Flavor::CatSet,
            Stmt::LevelDecl { .. } => Flavor::Level,
            Stmt::LevelRangeDecl { .. } => Flavor::LevelRange,
            Stmt::ContextDecl { .. } => Flavor::Context,
            Stmt::IpAddrDecl { .. } => Flavor::IpAddr,
            Stmt::PolicyCapDecl(_) => Flavor::PolicyCap,
            Stmt::Order { domain, .. } => match domain {
                OrderDomain::Class => Flavor::ClassOrder,
                OrderDomain::Category => Flavor::CategoryOrder,
                OrderDomain::Sensitivity => Flavor::SensitivityOrder,
                OrderDomain::Sid => Flavor::SidOrder,
            },
            Stmt::ClassCommon { .. } => Flavor::ClassCommon,
            Stmt::ClassPermissionSet { .. } => Flavor::ClassPermissionSet,
            Stmt::SensCat { .. } => Flavor::SensCat,
            Stmt::TypeAttrSet { .. } => Flavor::TypeAttrSet,
            Stmt::RoleAttrSet { .. } => Flavor::RoleAttrSet,
            Stmt::TypePermissive { .. } => Flavor::TypePermissive,
            Stmt::AvRule { .. } => Flavor::AvRule,
            Stmt::TypeRule { .. } => Flavor::TypeRule,
            Stmt::NameTypeTransition { .. } => Flavor::NameTypeTransition,
            Stmt::RangeTransition { .. } => Flavor::RangeTransition,
            Stmt::RoleType { .. } => Flavor::RoleType,
            Stmt::RoleAllow { .. } => Flavor::RoleAllow,
            Stmt::RoleTransition { .. } => Flavor::RoleTransition,
            Stmt::Bounds { .. } => Flavor::Bounds,
            Stmt::UserRole { .. } => Flavor::UserRole,
            Stmt::UserLevel { .. } => Flavor::UserLevel,
            Stmt::UserRange { .. } => Flavor::UserRange,
            Stmt::UserPrefix { .. } => Flavor::UserPrefix,
            Stmt::SelinuxUser { .. } => Flavor::SelinuxUser,
            Stmt::Constrain { .. } => Flavor::Constrain,
            Stmt::ValidateTrans { .. } => Flavor::ValidateTrans,
            Stmt::SidContext { .. } => Flavor::SidContext,
            Stmt::FileCon { .. } => Flavor::FileCon,
            Stmt::PortCon { .. } => Flavor::PortCon,
            Stmt::NodeCon { .. } => Flavor::NodeCon,
            Stmt::GenfsCon { .. } => Flavor::GenfsCon,
            Stmt::NetifCon { .. } => Flavor::NetifCon,
            Stmt::FsUse { .. } => Flavor::FsUse,
            Stmt::PirqCon { .. } => Flavor::PirqCon,
            Stmt::IomemCon { .. } => Flavor::IomemCon,
            Stmt::IoportCon { .. } => Flavor::IoportCon,
            Stmt::PciDeviceCon { .. } => Flavor::PciDeviceCon,
            Stmt::DeviceTreeCon { .. } => Flavor::DeviceTreeCon,
            Stmt::IbPkeyCon { .. } => Flavor::IbPkeyCon,
            Stmt::IbEndPortCon { .. } => Flavor::IbEndPortCon,
            Stmt::Default { .. } => Flavor::Default,
            Stmt::DefaultRange { .. } => Flavor::DefaultRange,
            Stmt::HandleUnknown { .. } => Flavor::HandleUnknown,
            Stmt::MlsFlag { .. } => Flavor::MlsFlag,
        }
    }
}
