use classgen::jvm::code::opcodes::*;
use classgen::jvm::code::Operand;
use classgen::jvm::model::Class;
use classgen::jvm::*;

use clap::{Arg, ArgAction, Command};
use std::path::PathBuf;

fn main() -> Result<(), Error> {
    env_logger::init();

    let matches = Command::new("JVM class file generator")
        .version(clap::crate_version!())
        .author("Alec Theriault <alec.theriault@gmail.com>")
        .about("Generates a counting demo class and writes it out as a class file")
        .arg(
            Arg::new("output")
                .long("output-dir")
                .value_name("DIRECTORY")
                .action(ArgAction::Set)
                .help("Sets the root directory class files are written under")
                .default_value("."),
        )
        .arg(
            Arg::new("class")
                .long("class")
                .value_name("CLASS_NAME")
                .action(ArgAction::Set)
                .help("Sets the (dotted) name of the generated class")
                .default_value("Counter"),
        )
        .arg(
            Arg::new("limit")
                .long("limit")
                .value_name("COUNT")
                .action(ArgAction::Set)
                .value_parser(clap::value_parser!(i32))
                .help("Sets how many numbers the generated class prints")
                .default_value("10"),
        )
        .arg(
            Arg::new("source file")
                .long("source-file")
                .value_name("FILE_NAME")
                .action(ArgAction::Set)
                .help("Records a source file name in the class"),
        )
        .arg(
            Arg::new("optimize")
                .long("optimize-pool")
                .action(ArgAction::SetTrue)
                .help("Orders the constant pool by use count, so hot entries get short indices"),
        )
        .get_matches();

    let class_name = matches
        .get_one::<String>("class")
        .map_or("Counter", String::as_str);
    let class_name = BinaryName::from_dotted(class_name).map_err(Error::InvalidName)?;
    let output_path: PathBuf = matches
        .get_one::<String>("output")
        .map_or_else(|| PathBuf::from("."), PathBuf::from);
    let limit = matches.get_one::<i32>("limit").copied().unwrap_or(10);

    log::info!("Generating '{}'", class_name);
    let mut class = counter_class(class_name, limit)?;
    if let Some(source_file) = matches.get_one::<String>("source file") {
        class.set_source_file(source_file.as_str());
    }
    if matches.get_flag("optimize") {
        class.constants_mut().optimize()?;
    }

    let class_file = class.save_to_directory(&output_path)?;
    log::info!(
        "Wrote '{}' ({} constant pool slots)",
        class_file.display(),
        class.constants().size()
    );

    Ok(())
}

/// Class with a static counter field and a `main` printing the counter until it reaches `limit`
fn counter_class(name: BinaryName, limit: i32) -> Result<Class, Error> {
    let count = UnqualifiedName::from_string(String::from("count")).map_err(Error::InvalidName)?;
    let mut class = Class::new(
        name.clone(),
        BinaryName::OBJECT,
        ClassAccessFlags::PUBLIC | ClassAccessFlags::SUPER | ClassAccessFlags::FINAL,
    )?;
    class.add_field(
        count.clone(),
        FieldType::int(),
        FieldAccessFlags::PUBLIC | FieldAccessFlags::STATIC,
    )?;

    let mut main = class.add_method(
        UnqualifiedName::MAIN,
        MethodDescriptor {
            parameters: vec![FieldType::array(FieldType::object(BinaryName::STRING))],
            return_type: None,
        },
        MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC,
    )?;
    let count_ref = main.field_ref(name, &count, &FieldType::int())?;
    let out_ref = main.field_ref(
        BinaryName::SYSTEM,
        &UnqualifiedName::OUT,
        &FieldType::object(BinaryName::PRINTSTREAM),
    )?;
    let println_ref = main.method_ref(
        BinaryName::PRINTSTREAM,
        &UnqualifiedName::PRINTLN,
        &MethodDescriptor {
            parameters: vec![FieldType::int()],
            return_type: None,
        },
    )?;

    main.push_int(0)?;
    main.append(PUTSTATIC, Operand::Constant(count_ref))?;
    let top = main.append(GETSTATIC, Operand::Constant(out_ref))?;
    main.append(GETSTATIC, Operand::Constant(count_ref))?;
    main.append(INVOKEVIRTUAL, Operand::Constant(println_ref))?;
    main.append(GETSTATIC, Operand::Constant(count_ref))?;
    main.push_int(1)?;
    main.append(IADD, Operand::None)?;
    main.append(DUP, Operand::None)?;
    main.append(PUTSTATIC, Operand::Constant(count_ref))?;
    main.push_int(limit)?;
    main.append(IF_ICMPLT, Operand::Branch(top.into()))?;
    main.append(RETURN, Operand::None)?;

    Ok(class)
}
