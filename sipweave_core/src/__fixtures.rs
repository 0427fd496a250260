use std::path::Path;

use crate::LexerOptions;
use crate::Scope;
use crate::SipweaveConfig;
use crate::SipweaveResult;
use crate::parse_header;
use crate::parse_sip;
use crate::parse_source;

/// A SIP file exactly as the writer lays it out.
pub const CANONICAL_SIP: &str = r"%ModuleHeaderCode
#include <widgets.h>
%End

// Widgets of the toolkit.
namespace Widgets
{
%TypeHeaderCode
#include <widgets.h>
%End
enum Mode
{
    Fast,
    Slow /PyName=Slowly/,
};

typedef QList<int> IntList;

class Widget : QObject /Abstract/
{
%TypeHeaderCode
#include <widgets.h>
%End
public:
    explicit Widget(QObject *parent /TransferThis/ = 0);
    virtual ~Widget();
    virtual void paint(int x, int y) const = 0;
    static int count();
    int *data(int index /Out/) [int * (int)];
protected:
    void resized(const QSize &size);
signals:
    void clicked();
//ig     void hidden();
};

};
";

/// Conditionals, forced runs, plain structs and function pointer typedefs.
pub const CANONICAL_SIP_EXTRAS: &str = r"%If (WIDGETS_VERSION >= 0x020000)
void legacy(int value);
%End

//force
int answer();
//end

struct Point
{
    int x;
    int y;
};

typedef void (*Callback)(int, void *);
";

/// Hand edits a maintainer makes to generated bindings: comments and markers
/// inside enums, comments at the end of declaration lines and a mapped type.
pub const HAND_EDITED_SIP: &str = r"%MappedType QList<int>
{
%TypeHeaderCode
#include <qlist.h>
%End

%ConvertFromTypeCode
    if (!sipCpp) {
        return nullptr;
    }
    return PyList_New(0);
%End
};

enum Color
{
    // primary colours
    Red,
//ig     Green,
    Blue, // default
//force
    Legacy,
//end

    // more to come
}; // Color

class Widget
{
public:
    void show(); // hand note
    int width; // pixels
};
";

pub const WIDGET_HEADER: &str = r"#ifndef WIDGET_H
#define WIDGET_H

namespace gfx {

enum Color { Red, Green };

class WIDGETS_EXPORT Widget : public Base
{
public:
    Widget(Widget *parent = nullptr);
    void setColor(Color color = Red);
    void setVisible(bool visible = true);
    virtual void draw() = 0;
    Widget &operator=(const Widget &other);
    short int size() const;
private:
    Widget(const Widget &other);
    int m_hidden;
};

class Helper
{
public:
    void help();
};

}

#endif
";

pub const WIDGET_CONFIG: &str = r#"
[transform]
export_macros = ["WIDGETS_EXPORT"]
ignore_bases = ["Base"]
"#;

pub const SHAPES_SIP: &str = r"class Shape
{
public:
    virtual ~Shape();
};

class Polygon : Shape
{
};

class Square : Polygon
{
};

class Circle : Shape
{
};
";

pub fn default_lexer_options() -> LexerOptions {
	SipweaveConfig::default().lexer_options()
}

pub fn parse_header_text(text: &str) -> SipweaveResult<Scope> {
	Ok(parse_source(text, None, &default_lexer_options())?)
}

pub fn parse_sip_text(text: &str) -> SipweaveResult<Scope> {
	Ok(parse_sip(text, None)?)
}

pub fn parse_widget_header() -> SipweaveResult<Scope> {
	let config = SipweaveConfig::from_toml(WIDGET_CONFIG)?;
	parse_header(Path::new("widget.h"), WIDGET_HEADER, &config)
}
