//! Function templates and package layout.
//!
//! Wraps the generated program of one group operation into a complete
//! function, one file per operation per group:
//!
//! ```text
//! <root>/pose2/__init__.py        (python modes)
//! <root>/pose2/compose.py
//! <root>/pose3/Compose.h          (cpp)
//! ```
//!
//! Templates print inputs by name (`a[0]`, `epsilon`) and temporaries as
//! `_tmp<n>`. Rendering is deterministic, so a package written twice is
//! byte-identical.

use super::generator::{generate, CodegenConfig, GeneratedCode};
use crate::cse::CseConfig;
use crate::error::{CodegenError, CodegenResult};
use crate::geo::{Argument, GroupKind, GroupOp};
use crate::printer::CodegenMode;
use log::debug;
use std::fmt::Write;
use std::fs;
use std::path::{Path, PathBuf};

const GENERATED_BY: &str = "This file was autogenerated by geo-codegen. Do NOT modify by hand.";
const RULE: &str = "-----------------------------------------------------------------------------";

/// Generation config used for every template.
pub fn template_config(mode: CodegenMode) -> CodegenConfig {
    CodegenConfig {
        mode,
        cse: true,
        cse_config: CseConfig::for_templates(),
    }
}

/// Generate the program of one group operation.
pub fn generate_op(group: GroupKind, op: GroupOp, mode: CodegenMode) -> CodegenResult<GeneratedCode> {
    generate(&group.build(op).request(template_config(mode)))
}

/// One complete function, without file header.
pub fn render_function(group: GroupKind, op: GroupOp, mode: CodegenMode) -> CodegenResult<String> {
    let code = generate_op(group, op, mode)?;
    let mut out = String::new();
    match mode {
        CodegenMode::Python2 | CodegenMode::Python3 => write_python_function(&mut out, group, op, &code)?,
        CodegenMode::Cpp => write_cpp_function(&mut out, group, op, &code)?,
    }
    Ok(out)
}

/// A whole source file holding one function.
pub fn render_file(group: GroupKind, op: GroupOp, mode: CodegenMode) -> CodegenResult<String> {
    let function = render_function(group, op, mode)?;
    let mut out = String::new();
    match mode {
        CodegenMode::Python2 | CodegenMode::Python3 => {
            writeln!(out, "# {}", RULE)?;
            writeln!(out, "# {}", GENERATED_BY)?;
            writeln!(out, "# {}", RULE)?;
            writeln!(out, "import numpy")?;
            writeln!(out)?;
            writeln!(out)?;
            out.push_str(&function);
        }
        CodegenMode::Cpp => {
            writeln!(out, "// {}", RULE)?;
            writeln!(out, "// {}", GENERATED_BY)?;
            writeln!(out, "// {}", RULE)?;
            writeln!(out, "#pragma once")?;
            writeln!(out)?;
            writeln!(out, "#include <algorithm>")?;
            writeln!(out, "#include <cmath>")?;
            writeln!(out, "#include <limits>")?;
            writeln!(out)?;
            writeln!(out, "#include <Eigen/Dense>")?;
            writeln!(out)?;
            writeln!(out, "namespace geo {{")?;
            writeln!(out, "namespace {} {{", group.name())?;
            writeln!(out)?;
            out.push_str(&function);
            writeln!(out)?;
            writeln!(out, "}}  // namespace {}", group.name())?;
            writeln!(out, "}}  // namespace geo")?;
        }
    }
    Ok(out)
}

/// Where the file for `op` lives under `root`.
pub fn artifact_path(root: &Path, group: GroupKind, op: GroupOp, mode: CodegenMode) -> PathBuf {
    let stem = match mode {
        CodegenMode::Python2 | CodegenMode::Python3 => op.name(),
        CodegenMode::Cpp => op.cpp_name(),
    };
    root.join(group.name())
        .join(format!("{}.{}", stem, mode.file_extension()))
}

/// Write every operation of every group under `root`. Returns the paths
/// written, in a fixed order.
pub fn write_package(root: &Path, mode: CodegenMode) -> CodegenResult<Vec<PathBuf>> {
    let mut written = Vec::new();
    for group in GroupKind::ALL {
        let dir = root.join(group.name());
        fs::create_dir_all(&dir).map_err(|source| CodegenError::Io {
            path: dir.clone(),
            source,
        })?;

        if mode.is_python() {
            let init = dir.join("__init__.py");
            write_file(&init, &render_init(group)?)?;
            written.push(init);
        }

        for op in GroupOp::ALL {
            let path = artifact_path(root, group, op, mode);
            write_file(&path, &render_file(group, op, mode)?)?;
            written.push(path);
        }
    }
    debug!("wrote {} {} files under {}", written.len(), mode, root.display());
    Ok(written)
}

fn write_file(path: &Path, contents: &str) -> CodegenResult<()> {
    fs::write(path, contents).map_err(|source| CodegenError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn render_init(group: GroupKind) -> CodegenResult<String> {
    let mut out = String::new();
    writeln!(out, "# {}", RULE)?;
    writeln!(out, "# {}", GENERATED_BY)?;
    writeln!(out, "# {}", RULE)?;
    writeln!(out, "\"\"\"")?;
    writeln!(out, "Generated {} operations.", group.type_name())?;
    writeln!(out, "\"\"\"")?;
    writeln!(out)?;
    for op in GroupOp::ALL {
        writeln!(out, "from .{0} import {0}", op.name())?;
    }
    Ok(out)
}

fn write_python_function(
    out: &mut String,
    group: GroupKind,
    op: GroupOp,
    code: &GeneratedCode,
) -> CodegenResult<()> {
    let params: Vec<&str> = op.arguments().iter().map(|a| a.name()).collect();
    writeln!(out, "def {}({}):", op.name(), params.join(", "))?;
    writeln!(out, "    \"\"\"")?;
    writeln!(out, "    {} {}.", group.type_name(), op.name())?;
    writeln!(out, "    \"\"\"")?;
    writeln!(out, "    # Total ops: {}", code.total_ops)?;
    writeln!(out)?;
    writeln!(out, "    # Output array")?;
    writeln!(out, "    res = [0.] * {}", code.outputs.len())?;
    writeln!(out)?;
    writeln!(out, "    # Intermediate terms ({})", code.temporaries.len())?;
    for (name, value) in &code.temporaries {
        writeln!(out, "    {} = {}", name, value)?;
    }
    writeln!(out)?;
    writeln!(out, "    # Output terms ({})", code.outputs.len())?;
    for (i, value) in code.outputs.iter().enumerate() {
        writeln!(out, "    res[{}] = {}", i, value)?;
    }
    writeln!(out)?;
    writeln!(out, "    return res")?;
    Ok(())
}

fn cpp_vector(dim: usize) -> String {
    format!("Eigen::Matrix<Scalar, {}, 1>", dim)
}

fn write_cpp_function(
    out: &mut String,
    group: GroupKind,
    op: GroupOp,
    code: &GeneratedCode,
) -> CodegenResult<()> {
    let params: Vec<String> = op
        .arguments()
        .iter()
        .map(|arg| match arg.dim(group) {
            Some(dim) => format!("const {}& {}", cpp_vector(dim), arg.name()),
            None => format!("const Scalar {}", arg.name()),
        })
        .collect();
    let result = cpp_vector(group.output_dim(op));

    writeln!(out, "/**")?;
    writeln!(out, " * {} {}.", group.type_name(), op.name())?;
    if op.arguments().contains(&Argument::Epsilon) {
        writeln!(out, " *")?;
        writeln!(out, " * epsilon must be strictly positive.")?;
    }
    writeln!(out, " *")?;
    writeln!(out, " * Total ops: {}", code.total_ops)?;
    writeln!(out, " */")?;
    writeln!(out, "template <typename Scalar>")?;
    writeln!(out, "{} {}({}) {{", result, op.cpp_name(), params.join(", "))?;
    writeln!(out, "  // Intermediate terms ({})", code.temporaries.len())?;
    for (name, value) in &code.temporaries {
        writeln!(out, "  const Scalar {} = {};", name, value)?;
    }
    writeln!(out)?;
    writeln!(out, "  // Output terms ({})", code.outputs.len())?;
    writeln!(out, "  {} res;", result)?;
    for (i, value) in code.outputs.iter().enumerate() {
        writeln!(out, "  res[{}] = {};", i, value)?;
    }
    writeln!(out)?;
    writeln!(out, "  return res;")?;
    writeln!(out, "}}")?;
    Ok(())
}
